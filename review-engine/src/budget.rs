//! Per-installation monthly token/cost accounting (grounded in the
//! source's `cost_tracker.py`).

use chrono::{Datelike, Utc};

use crate::error::ReviewResult;
use crate::models::{Installation, Repository};
use crate::store::Store;

pub struct BudgetCheck {
    pub has_budget: bool,
    pub remaining_cents: i64,
    pub budget_cents: i64,
}

/// `cost_cents = floor(input*input_rate/1e6 + output*output_rate/1e6)`
/// (§4.5 step 11), rates in cents per million tokens.
pub fn calculate_cost_cents(
    input_tokens: u64,
    output_tokens: u64,
    input_rate_cents_per_million: f64,
    output_rate_cents_per_million: f64,
) -> i64 {
    let input_cost = (input_tokens as f64 / 1_000_000.0) * input_rate_cents_per_million;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * output_rate_cents_per_million;
    (input_cost + output_cost).floor() as i64
}

pub async fn check_budget<S: Store>(
    store: &S,
    installation: &Installation,
    repo: &Repository,
) -> ReviewResult<BudgetCheck> {
    if !installation.is_active {
        return Ok(BudgetCheck { has_budget: false, remaining_cents: 0, budget_cents: 0 });
    }

    let budget_cents = repo.effective_budget_cents(installation);

    let now = Utc::now();
    let usage = store.get_usage_record(installation.id, now.year(), now.month()).await?;
    let current_spend = usage.map(|record| record.total_cost_cents).unwrap_or(0);
    let remaining = budget_cents - current_spend;

    Ok(BudgetCheck { has_budget: remaining > 0, remaining_cents: remaining, budget_cents })
}

/// The one-line PR comment posted when the budget gate fails (§8 scenario
/// 3): `"Monthly budget of $1.00 has been exceeded"`.
pub fn budget_exceeded_comment(budget_cents: i64) -> String {
    format!(
        "**AI Review skipped**: Monthly budget of ${:.2} has been exceeded. Reviews will \
         resume next month or when the budget is increased.",
        budget_cents as f64 / 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_floors_down() {
        // 1000 input tokens @ 300c/M + 500 output @ 1500c/M = 0.3 + 0.75 = 1.05 -> floor 1
        assert_eq!(calculate_cost_cents(1000, 500, 300.0, 1500.0), 1);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(calculate_cost_cents(0, 0, 300.0, 1500.0), 0);
    }

    #[test]
    fn exceeded_comment_formats_dollars() {
        let comment = budget_exceeded_comment(100);
        assert!(comment.contains("Monthly budget of $1.00 has been exceeded"));
    }
}

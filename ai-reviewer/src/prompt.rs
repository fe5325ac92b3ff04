use crate::types::ReviewRequest;

const CONTEXT_FILE_BYTE_LIMIT: usize = 5_000;
const CONTEXT_FILE_COUNT_LIMIT: usize = 5;

/// Enumerates the enabled rule categories and injects language/framework
/// hints; this is the only place prompt wording lives.
pub fn build_system_prompt(req: &ReviewRequest<'_>) -> String {
    let mut categories = Vec::new();
    if req.rules.security {
        categories.push("security vulnerabilities".to_string());
    }
    if req.rules.performance {
        categories.push("performance issues".to_string());
    }
    if req.rules.style {
        categories.push("style and readability".to_string());
    }
    if req.rules.bugs {
        categories.push("likely bugs and correctness issues".to_string());
    }
    if req.rules.documentation {
        categories.push("missing or incorrect documentation".to_string());
    }
    for (name, description) in &req.rules.custom {
        categories.push(format!("{name} ({description})"));
    }

    let mut prompt = String::from(
        "You are an automated code reviewer. Review the given unified diff \
         and respond with a single JSON object only, no prose outside it, \
         shaped as: {\"summary\": string, \"risk_level\": \
         \"low\"|\"medium\"|\"high\"|\"critical\", \"comments\": \
         [{\"file\": string, \"line\": number, \"severity\": \
         \"critical\"|\"warning\"|\"suggestion\"|\"nitpick\"|\"praise\", \
         \"category\": string, \"message\": string, \"suggested_fix\": \
         string|null}]}.\n\n",
    );

    if categories.is_empty() {
        prompt.push_str("No review categories are enabled; return an empty comments list.\n");
    } else {
        prompt.push_str("Focus your review on: ");
        prompt.push_str(&categories.join(", "));
        prompt.push_str(".\n");
    }

    if !req.languages.is_empty() {
        prompt.push_str(&format!("Primary language(s): {}.\n", req.languages.join(", ")));
    }
    if !req.frameworks.is_empty() {
        prompt.push_str(&format!("Framework(s) in use: {}.\n", req.frameworks.join(", ")));
    }
    if let Some(extra) = req.additional_instructions {
        prompt.push_str("Additional repository instructions:\n");
        prompt.push_str(extra);
        prompt.push('\n');
    }

    prompt
}

/// Concatenates the title, description, diff, and any context files into
/// the single user message the endpoint sees.
pub fn build_user_prompt(req: &ReviewRequest<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Pull request title: {}\n", req.pr_title));
    if let Some(body) = req.pr_body {
        if !body.is_empty() {
            prompt.push_str(&format!("Pull request description:\n{body}\n"));
        }
    }
    if let Some(context) = req.context_blob {
        prompt.push_str("\nContext files (read-only, truncated):\n");
        prompt.push_str(context);
        prompt.push('\n');
    }
    prompt.push_str("\nDiff to review:\n```diff\n");
    prompt.push_str(req.diff_text);
    prompt.push_str("\n```\n");
    prompt
}

/// Truncates a single context file's content to the per-file byte limit,
/// on a char boundary.
pub fn truncate_context_file(content: &str) -> &str {
    if content.len() <= CONTEXT_FILE_BYTE_LIMIT {
        return content;
    }
    let mut end = CONTEXT_FILE_BYTE_LIMIT;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

/// Joins up to [`CONTEXT_FILE_COUNT_LIMIT`] `(path, content)` pairs into a
/// single labeled blob, truncating each file individually.
pub fn build_context_blob(files: &[(String, String)]) -> Option<String> {
    if files.is_empty() {
        return None;
    }
    let mut blob = String::new();
    for (path, content) in files.iter().take(CONTEXT_FILE_COUNT_LIMIT) {
        blob.push_str(&format!("--- {path} ---\n"));
        blob.push_str(truncate_context_file(content));
        blob.push('\n');
    }
    Some(blob)
}

/// Strips a single leading/trailing fenced code block (```` ```json ```` or
/// plain ```` ``` ````) that models commonly wrap structured output in.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches(['\n', '\r']);
    after_open.strip_suffix("```").unwrap_or(after_open).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let wrapped = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"a\":1}");
    }

    #[test]
    fn strips_plain_fence() {
        let wrapped = "```\n{\"a\":1}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"a\":1}");
    }

    #[test]
    fn leaves_unwrapped_text_alone() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "é".repeat(CONTEXT_FILE_BYTE_LIMIT);
        let truncated = truncate_context_file(&long);
        assert!(truncated.len() <= CONTEXT_FILE_BYTE_LIMIT);
        assert!(long.starts_with(truncated));
    }
}

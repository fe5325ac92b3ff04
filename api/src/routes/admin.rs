//! Minimal read-only operator endpoints over installation and usage state.

use axum::Json;
use axum::extract::{Path, State};
use review_engine::{Installation, Store, UsageRecord};

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};

pub async fn get_installation(
    State(state): State<AppState>,
    Path(installation_id): Path<i64>,
) -> AppResult<Json<Installation>> {
    state
        .store
        .get_installation(installation_id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn get_usage(
    State(state): State<AppState>,
    Path((installation_id, year, month)): Path<(i64, i32, u32)>,
) -> AppResult<Json<UsageRecord>> {
    state
        .store
        .get_usage_record(installation_id, year, month)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::time::Duration;

use crate::domain::Caller;
use crate::error::AppError;
use crate::services::AccrualEngine;
use crate::AppState;

pub async fn run_accrual(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, AppError> {
    let engine = AccrualEngine::new(
        state.gateway.clone(),
        Duration::from_secs(state.config.accrual_deadline_secs),
    );
    let summary = engine.run_cycle(&caller).await?;
    Ok(Json(summary))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::gateway::PersistenceGateway;
use crate::services::registration::{RegisterInput, RegistrationService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub referral_code: Option<String>,
    pub plan_id: Option<Uuid>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    let service = RegistrationService::new(state.gateway.clone());
    let account = service
        .register(RegisterInput {
            referral_code: payload.referral_code,
            plan_id: payload.plan_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn yield_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .gateway
        .account(id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;

    let records = state.gateway.yield_records(id).await.map_err(AppError::from)?;
    Ok(Json(records))
}

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::ReferralNetwork;
use crate::AppState;

pub async fn network_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let service = ReferralNetwork::new(
        state.gateway.clone(),
        Duration::from_secs(state.config.network_deadline_secs),
    );
    let report = service.compute(id).await?;
    Ok(Json(report))
}

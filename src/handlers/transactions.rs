use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Caller, TransactionKind, TransactionStatus};
use crate::error::AppError;
use crate::services::ReviewService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitPayload {
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: BigDecimal,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitPayload>,
) -> Result<impl IntoResponse, AppError> {
    let service = ReviewService::new(state.gateway.clone());
    let tx = service
        .submit(payload.account_id, payload.kind, payload.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<TransactionStatus>,
}

pub async fn list_by_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, AppError> {
    let status = filter.status.unwrap_or(TransactionStatus::Pending);
    let service = ReviewService::new(state.gateway.clone());
    let transactions = service.list_by_status(&caller, status).await?;
    Ok(Json(transactions))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let service = ReviewService::new(state.gateway.clone());
    let tx = service.approve(&caller, id).await?;
    Ok(Json(tx))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let service = ReviewService::new(state.gateway.clone());
    let tx = service.reject(&caller, id).await?;
    Ok(Json(tx))
}

pub mod accounts;
pub mod accrual;
pub mod export;
pub mod network;
pub mod transactions;

use axum::Json;
use serde_json::json;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

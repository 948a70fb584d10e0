pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::gateway::PersistenceGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PersistenceGateway>,
    pub config: Config,
}

pub fn create_app(state: AppState) -> Router {
    let admin = Router::new()
        .route("/accrual/run", post(handlers::accrual::run_accrual))
        .route("/transactions", get(handlers::transactions::list_by_status))
        .route(
            "/transactions/:id/approve",
            post(handlers::transactions::approve),
        )
        .route(
            "/transactions/:id/reject",
            post(handlers::transactions::reject),
        )
        .route("/yields/export", get(handlers::export::export_yields))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/accounts", post(handlers::accounts::register))
        .route("/accounts/:id/yields", get(handlers::accounts::yield_history))
        .route("/accounts/:id/network", get(handlers::network::network_report))
        .route("/transactions", post(handlers::transactions::submit))
        .nest("/admin", admin)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

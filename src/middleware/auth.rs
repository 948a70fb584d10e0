use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::domain::Caller;
use crate::error::AppError;
use crate::AppState;

/// Gates admin routes on the configured API key and attaches an explicit
/// administrator [`Caller`] to the request for downstream handlers.
pub async fn admin_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let key = state.config.admin_api_key.as_str();

    match auth_header {
        Some(auth) if auth == format!("Bearer {}", key) || auth == key => {
            req.extensions_mut().insert(Caller::admin("api"));
            Ok(next.run(req).await)
        }
        _ => Err(AppError::Unauthorized(
            "administrator credentials required".to_string(),
        )),
    }
}

//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the service
//! layer for business logic. Storefront endpoints live in [`public`],
//! back-office endpoints (behind [`AdminUser`](super::auth::AdminUser)) in
//! [`admin`].

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};

use super::dto::HealthResponse;
use super::error::AppError;
use super::state::AppState;

pub mod admin;
pub mod public;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// GET /health
///
/// Health check endpoint to verify the service is running and the store is
/// reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            "error".to_string()
        }
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

//! Admin authorization.
//!
//! Admin handlers take an [`AdminUser`] argument. Extraction reads the bearer
//! token, resolves it to an auth subject through the configured
//! [`SessionVerifier`](crate::clients::SessionVerifier), and requires a user
//! profile with the `admin` role.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::AppError;
use super::state::AppState;
use crate::clients::ClientError;
use crate::models::UserProfile;

/// An authenticated back-office user.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserProfile);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))?;
    Ok(token)
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let subject = state.verifier.verify(token).await.map_err(|e| match e {
            ClientError::Unauthorized(_) | ClientError::NotFound(_) => {
                AppError::Unauthorized("Invalid or expired session".to_string())
            }
            other => AppError::BadGateway(other.to_string()),
        })?;

        let profile = state
            .repository
            .get_user(&subject)
            .await?
            .ok_or_else(|| AppError::Forbidden("No back-office profile for this user".to_string()))?;
        if !profile.is_admin() {
            tracing::warn!(user = %profile.user_id, "non-admin user attempted admin access");
            return Err(AppError::Forbidden("Admin role required".to_string()));
        }
        Ok(AdminUser(profile))
    }
}

//! Clients for the external collaborators: the payment processor, object
//! storage, the translation model and the hosted auth service.
//!
//! Each collaborator sits behind an async trait so services can be exercised
//! with the in-memory implementations in tests.

pub mod auth;
pub mod payment;
pub mod storage;
pub mod translator;

pub use auth::{HttpSessionVerifier, SessionVerifier, StaticSessionVerifier};
pub use payment::{
    MockPaymentGateway, PaymentGateway, PaymentIntent, PaymentIntentRequest, PaymentStatus,
    StripeGateway,
};
pub use storage::{HttpObjectStorage, InMemoryObjectStorage, ObjectStorage};
pub use translator::{AnthropicTranslator, MockTranslator, Translator};

use std::time::Duration;

/// Errors raised by external clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The remote service answered with a non-success status.
    #[error("Remote service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Shared reqwest client with a request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Turn a non-success response into [`ClientError::Status`], logging the body.
pub(crate) async fn check_status(
    service: &str,
    response: reqwest::Response,
) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} error ({}): {}", service, status, body);
    Err(match status.as_u16() {
        401 | 403 => ClientError::Unauthorized(body),
        404 => ClientError::NotFound(body),
        code => ClientError::Status { status: code, body },
    })
}

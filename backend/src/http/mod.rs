//! HTTP server module for the tour booking backend.
//!
//! An axum application over the service layer. Handlers parse requests,
//! call into [`crate::services`] with the shared repository and clients, and
//! map [`ServiceError`](crate::services::ServiceError) to JSON error bodies.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - /v1 storefront, /v1/admin behind AdminUser             │
//! │  - CORS, compression, body limits, error mapping          │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                                │
//! │  - Pricing, checkout, availability, content, analytics    │
//! └─────────┬─────────────────────────────────┬──────────────┘
//!           │                                 │
//! ┌─────────▼──────────────────┐   ┌──────────▼───────────────┐
//! │  Repository Layer (db/)    │   │  External clients        │
//! │  Local / Postgres          │   │  payment, storage, ...   │
//! └────────────────────────────┘   └──────────────────────────┘
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use auth::AdminUser;
pub use error::AppError;
pub use router::create_router;
pub use state::AppState;

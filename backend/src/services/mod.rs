//! Service layer for business logic and orchestration.
//!
//! Services sit between the HTTP handlers and the repository/clients. Each
//! operation validates its input, calls the store and external collaborators,
//! and reports failures as a [`ServiceError`]. Functions are generic over the
//! repository traits they need so they run against any backend.

pub mod analytics;
pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod pages;
pub mod pricing;
pub mod translation;
pub mod uploads;

pub use checkout::{CheckoutRequest, CheckoutSession, CheckoutSettings, Voucher};
pub use error::{ServiceError, ServiceResult};
pub use pricing::{quote, Participants, PriceQuote, QuoteRequest, UpsellSelection};

//! Repository trait definitions for database operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! the hosted relational store. By splitting responsibilities across multiple
//! traits, implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`tour`]: Tours, content blocks, pricing, upsells and packages
//! - [`availability`]: Availability slots and seat reservation
//! - [`booking`]: Bookings and their line items
//! - [`content`]: Static pages, categories and special labels
//! - [`analytics`]: Page-visit events
//! - [`user`]: Back-office user profiles used for authorization
//!
//! # Convenience Trait Bound
//!
//! For code that needs every capability (the HTTP state, the services), use
//! the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn checkout<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let slot = repo.reserve_seats(slot_id, 2).await?;
//!     repo.create_booking(&new_booking).await?;
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod availability;
pub mod booking;
pub mod content;
pub mod error;
pub mod tour;
pub mod user;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use analytics::AnalyticsRepository;
pub use availability::AvailabilityRepository;
pub use booking::BookingRepository;
pub use content::ContentRepository;
pub use tour::TourRepository;
pub use user::UserRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements all repository
/// traits.
pub trait FullRepository:
    TourRepository
    + AvailabilityRepository
    + BookingRepository
    + ContentRepository
    + AnalyticsRepository
    + UserRepository
{
}

// Blanket implementation: any type implementing all traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: TourRepository
        + AvailabilityRepository
        + BookingRepository
        + ContentRepository
        + AnalyticsRepository
        + UserRepository
{
}

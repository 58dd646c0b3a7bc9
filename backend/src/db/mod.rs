//! Storage layer for the booking backend.
//!
//! Services and handlers talk to storage only through the repository traits
//! in [`repository`], so the backend can be swapped between the in-memory
//! store and Postgres.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  HTTP handlers (axum)                       │
//! └──────────────────┬──────────────────────────┘
//!                    │
//! ┌──────────────────▼──────────────────────────┐
//! │  Services: pricing, checkout, catalog, ...  │
//! └──────────────────┬──────────────────────────┘
//!                    │
//! ┌──────────────────▼──────────────────────────┐
//! │  Repository traits (FullRepository)         │
//! └─────────┬───────────────────────┬───────────┘
//!           │                       │
//!   ┌───────▼────────┐     ┌────────▼─────────┐
//!   │ LocalRepository│     │PostgresRepository│
//!   │  (in-memory)   │     │ (Diesel + r2d2)  │
//!   └────────────────┘     └──────────────────┘
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    AnalyticsRepository, AvailabilityRepository, BookingRepository, ContentRepository,
    ErrorContext, FullRepository, RepositoryError, RepositoryResult, TourRepository,
    UserRepository,
};

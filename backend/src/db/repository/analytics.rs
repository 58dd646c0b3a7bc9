//! Analytics repository trait for page-visit events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{NewPageVisit, PageVisit};

/// Repository trait for analytics events.
///
/// Aggregation happens in the service layer; the store only appends and
/// returns raw events.
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Append a page-visit event.
    async fn record_visit(&self, visit: &NewPageVisit) -> RepositoryResult<PageVisit>;

    /// Fetch visits with `from <= visited_at < to`, oldest first.
    async fn list_visits(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<PageVisit>>;
}

//! Tour catalog repository trait.
//!
//! Covers tours and everything edited alongside them in the back office:
//! content blocks, pricing configuration, upsells and packages.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    BlockId, Package, PackageId, PackageInput, PricingConfig, Tour, TourBlock, TourBlockInput,
    TourFilter, TourId, TourInput, TourPricing, Upsell, UpsellId, UpsellInput,
};

/// Repository trait for tour catalog operations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait TourRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the database connection is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Tours ====================

    /// List tours matching `filter`, ordered by id.
    async fn list_tours(&self, filter: TourFilter) -> RepositoryResult<Vec<Tour>>;

    /// Retrieve a tour by ID.
    ///
    /// # Returns
    /// * `Ok(Tour)` - The tour
    /// * `Err(RepositoryError::NotFound)` - If the tour doesn't exist
    async fn get_tour(&self, tour_id: TourId) -> RepositoryResult<Tour>;

    /// Retrieve a tour by its URL slug.
    async fn get_tour_by_slug(&self, slug: &str) -> RepositoryResult<Tour>;

    /// Create a tour.
    ///
    /// # Returns
    /// * `Ok(Tour)` - The stored tour with its assigned ID
    /// * `Err(RepositoryError::ConflictError)` - If the slug is taken
    async fn create_tour(&self, input: &TourInput) -> RepositoryResult<Tour>;

    /// Replace the editable fields of a tour.
    async fn update_tour(&self, tour_id: TourId, input: &TourInput) -> RepositoryResult<Tour>;

    /// Delete a tour together with its blocks, pricing, upsells, packages
    /// and slots.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConflictError)` - If bookings reference the tour
    async fn delete_tour(&self, tour_id: TourId) -> RepositoryResult<()>;

    // ==================== Content Blocks ====================

    /// List blocks of a tour ordered by position.
    async fn list_blocks(&self, tour_id: TourId) -> RepositoryResult<Vec<TourBlock>>;

    async fn get_block(&self, block_id: BlockId) -> RepositoryResult<TourBlock>;

    /// Insert a block, or replace it when `input.id` is set.
    async fn upsert_block(
        &self,
        tour_id: TourId,
        input: &TourBlockInput,
    ) -> RepositoryResult<TourBlock>;

    async fn delete_block(&self, block_id: BlockId) -> RepositoryResult<()>;

    // ==================== Pricing ====================

    /// Fetch the pricing configuration, if one was set.
    async fn get_pricing(&self, tour_id: TourId) -> RepositoryResult<Option<TourPricing>>;

    /// Store the pricing configuration, replacing any previous one.
    async fn set_pricing(
        &self,
        tour_id: TourId,
        config: &PricingConfig,
    ) -> RepositoryResult<TourPricing>;

    // ==================== Upsells & Packages ====================

    async fn list_upsells(&self, tour_id: TourId) -> RepositoryResult<Vec<Upsell>>;

    async fn create_upsell(&self, tour_id: TourId, input: &UpsellInput)
        -> RepositoryResult<Upsell>;

    async fn update_upsell(&self, upsell_id: UpsellId, input: &UpsellInput)
        -> RepositoryResult<Upsell>;

    async fn delete_upsell(&self, upsell_id: UpsellId) -> RepositoryResult<()>;

    async fn list_packages(&self, tour_id: TourId) -> RepositoryResult<Vec<Package>>;

    async fn create_package(
        &self,
        tour_id: TourId,
        input: &PackageInput,
    ) -> RepositoryResult<Package>;

    async fn delete_package(&self, package_id: PackageId) -> RepositoryResult<()>;
}

//! Availability slot repository trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::RepositoryResult;
use crate::models::{AvailabilitySlot, SlotId, SlotInput, TourId};

/// Repository trait for availability slots.
///
/// Seat accounting lives here so that the store can apply it atomically:
/// implementations must never let `booked` exceed `capacity` through
/// [`AvailabilityRepository::reserve_seats`], even under concurrent calls.
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// List slots of a tour between `from` and `to` (both inclusive),
    /// ordered by date then start time.
    async fn list_slots(
        &self,
        tour_id: TourId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<AvailabilitySlot>>;

    async fn get_slot(&self, slot_id: SlotId) -> RepositoryResult<AvailabilitySlot>;

    /// Create a slot.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConflictError)` - If the tour already has a slot
    ///   at the same date and time
    async fn create_slot(
        &self,
        tour_id: TourId,
        input: &SlotInput,
    ) -> RepositoryResult<AvailabilitySlot>;

    async fn delete_slot(&self, slot_id: SlotId) -> RepositoryResult<()>;

    /// Atomically add `seats` to the booked count.
    ///
    /// # Returns
    /// * `Ok(AvailabilitySlot)` - The slot after the reservation
    /// * `Err(RepositoryError::ConflictError)` - If capacity would be exceeded
    async fn reserve_seats(&self, slot_id: SlotId, seats: u32)
        -> RepositoryResult<AvailabilitySlot>;

    /// Give back `seats`; the booked count never drops below zero.
    async fn release_seats(&self, slot_id: SlotId, seats: u32)
        -> RepositoryResult<AvailabilitySlot>;
}

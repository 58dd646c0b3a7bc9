//! Booking repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Booking, BookingFilter, BookingId, BookingStatus, NewBooking};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Store a booking and its line items.
    ///
    /// # Returns
    /// * `Ok(Booking)` - The booking with assigned ID and timestamps
    /// * `Err(RepositoryError::ConflictError)` - If the voucher token is taken
    async fn create_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking>;

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking>;

    /// Look a booking up by the token printed on its voucher.
    async fn get_booking_by_token(&self, token: &str) -> RepositoryResult<Booking>;

    /// List bookings matching `filter`, newest first.
    async fn list_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Vec<Booking>>;

    async fn update_booking_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking>;

    /// Move a booking from `from` to `to` if it is still in `from`.
    ///
    /// # Returns
    /// * `Ok(Some(Booking))` - The updated booking
    /// * `Ok(None)` - The booking exists but is no longer in `from`
    /// * `Err(RepositoryError::NotFoundError)` - If the booking does not exist
    async fn transition_booking_status(
        &self,
        booking_id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> RepositoryResult<Option<Booking>>;

    /// Remember the payment intent created for the booking.
    async fn set_payment_intent(
        &self,
        booking_id: BookingId,
        payment_intent_id: &str,
    ) -> RepositoryResult<Booking>;

    async fn update_booking_notes(
        &self,
        booking_id: BookingId,
        notes: Option<String>,
    ) -> RepositoryResult<Booking>;
}

//! Back-office booking management.

use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::db::repository::{AvailabilityRepository, BookingRepository, TourRepository};
use crate::models::{
    localize, AvailabilitySlot, Booking, BookingFilter, BookingId, BookingStatus, Language,
};

/// Booking with the context an operator needs on the detail screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetail {
    pub booking: Booking,
    pub tour_title: String,
    pub slot: AvailabilitySlot,
}

pub async fn list_bookings<R>(repo: &R, filter: &BookingFilter) -> ServiceResult<Vec<Booking>>
where
    R: BookingRepository + ?Sized,
{
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if to < from {
            return Err(ServiceError::validation(
                "'to' must not be before 'from'",
            ));
        }
    }
    Ok(repo.list_bookings(filter).await?)
}

pub async fn booking_detail<R>(
    repo: &R,
    booking_id: BookingId,
    default_language: Language,
) -> ServiceResult<BookingDetail>
where
    R: TourRepository + AvailabilityRepository + BookingRepository + ?Sized,
{
    let booking = repo.get_booking(booking_id).await?;
    let tour = repo.get_tour(booking.tour_id).await?;
    let slot = repo.get_slot(booking.slot_id).await?;
    let tour_title = localize(&tour.translations, booking.language, default_language)
        .map(|(_, text)| text.title.clone())
        .unwrap_or(tour.slug);
    Ok(BookingDetail {
        booking,
        tour_title,
        slot,
    })
}

/// Move a booking to `status`.
///
/// Leaving a seat-holding status frees the seats; entering one from a
/// non-holding status reserves them again, failing when the slot is full.
/// The change only applies if nobody moved the booking in the meantime.
pub async fn change_status<R>(
    repo: &R,
    booking_id: BookingId,
    status: BookingStatus,
) -> ServiceResult<Booking>
where
    R: AvailabilityRepository + BookingRepository + ?Sized,
{
    let booking = repo.get_booking(booking_id).await?;
    if booking.status == status {
        return Ok(booking);
    }

    let seats = booking.participants();
    let reserve = !booking.status.holds_seats() && status.holds_seats();
    let release = booking.status.holds_seats() && !status.holds_seats();

    if reserve {
        repo.reserve_seats(booking.slot_id, seats).await?;
    }
    let transition = repo
        .transition_booking_status(booking_id, booking.status, status)
        .await;
    let updated = match transition {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            if reserve {
                release_after_abort(repo, &booking).await;
            }
            return Err(ServiceError::conflict(format!(
                "Booking {} changed while updating its status, retry",
                booking_id
            )));
        }
        Err(err) => {
            if reserve {
                release_after_abort(repo, &booking).await;
            }
            return Err(err.into());
        }
    };
    if release {
        repo.release_seats(booking.slot_id, seats).await?;
    }

    log::info!(
        "Booking {} status {} -> {}",
        booking_id,
        booking.status.as_str(),
        status.as_str()
    );
    Ok(updated)
}

async fn release_after_abort<R>(repo: &R, booking: &Booking)
where
    R: AvailabilityRepository + ?Sized,
{
    if let Err(err) = repo
        .release_seats(booking.slot_id, booking.participants())
        .await
    {
        log::error!(
            "Failed to return seats of booking {} to slot {}: {}",
            booking.id,
            booking.slot_id,
            err
        );
    }
}

pub async fn cancel_booking<R>(repo: &R, booking_id: BookingId) -> ServiceResult<Booking>
where
    R: AvailabilityRepository + BookingRepository + ?Sized,
{
    change_status(repo, booking_id, BookingStatus::Cancelled).await
}

pub async fn update_notes<R>(
    repo: &R,
    booking_id: BookingId,
    notes: Option<String>,
) -> ServiceResult<Booking>
where
    R: BookingRepository + ?Sized,
{
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > 5000) {
        return Err(ServiceError::validation("Notes are limited to 5000 characters"));
    }
    Ok(repo.update_booking_notes(booking_id, notes).await?)
}

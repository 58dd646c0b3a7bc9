//! Availability slots: storefront listing and back-office scheduling.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::db::repository::{AvailabilityRepository, TourRepository};
use crate::models::{AvailabilitySlot, SlotInput, TourId};

/// Longest range accepted by [`create_slots_bulk`].
pub const MAX_BULK_DAYS: i64 = 366;

/// Slots a customer can still book: on or after `today`, with seats left.
pub async fn list_open_slots<R>(
    repo: &R,
    tour_id: TourId,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> ServiceResult<Vec<AvailabilitySlot>>
where
    R: AvailabilityRepository + ?Sized,
{
    if to < from {
        return Err(ServiceError::validation(
            "'to' must not be before 'from'",
        ));
    }
    let from = from.max(today);
    if to < from {
        return Ok(Vec::new());
    }
    let slots = repo.list_slots(tour_id, from, to).await?;
    Ok(slots
        .into_iter()
        .filter(|slot| slot.date >= today && !slot.is_full())
        .collect())
}

/// Ensure `slot` can take `participants` more seats.
pub fn check_capacity(slot: &AvailabilitySlot, participants: u32) -> ServiceResult<()> {
    if participants == 0 {
        return Err(ServiceError::validation(
            "At least one participant is required",
        ));
    }
    if !slot.can_accommodate(participants) {
        return Err(ServiceError::conflict(format!(
            "Only {} seats left, {} requested",
            slot.remaining(),
            participants
        )));
    }
    Ok(())
}

fn validate_slot(input: &SlotInput) -> ServiceResult<()> {
    if input.capacity == 0 {
        return Err(ServiceError::validation("Capacity must be greater than 0"));
    }
    if input.booked > input.capacity {
        return Err(ServiceError::validation(format!(
            "Booked seats ({}) exceed capacity ({})",
            input.booked, input.capacity
        )));
    }
    Ok(())
}

pub async fn create_slot<R>(
    repo: &R,
    tour_id: TourId,
    input: &SlotInput,
) -> ServiceResult<AvailabilitySlot>
where
    R: TourRepository + AvailabilityRepository + ?Sized,
{
    validate_slot(input)?;
    repo.get_tour(tour_id).await?;
    let slot = repo.create_slot(tour_id, input).await?;
    log::info!(
        "Created slot {} for tour {} on {} {}",
        slot.id,
        tour_id,
        slot.date,
        slot.start_time
    );
    Ok(slot)
}

/// Slots for every day of a range at each of the given start times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSlotInput {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub start_times: Vec<NaiveTime>,
    pub capacity: u32,
    /// Restrict to these weekdays; every day when empty.
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
}

impl BulkSlotInput {
    fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from
            .iter_days()
            .take_while(move |d| *d <= self.to)
            .filter(move |d| self.weekdays.is_empty() || self.weekdays.contains(&d.weekday()))
    }
}

pub async fn create_slots_bulk<R>(
    repo: &R,
    tour_id: TourId,
    input: &BulkSlotInput,
) -> ServiceResult<Vec<AvailabilitySlot>>
where
    R: TourRepository + AvailabilityRepository + ?Sized,
{
    if input.to < input.from {
        return Err(ServiceError::validation(
            "'to' must not be before 'from'",
        ));
    }
    if (input.to - input.from).num_days() >= MAX_BULK_DAYS {
        return Err(ServiceError::validation(format!(
            "Bulk creation covers at most {} days",
            MAX_BULK_DAYS
        )));
    }
    if input.start_times.is_empty() {
        return Err(ServiceError::validation(
            "At least one start time is required",
        ));
    }
    repo.get_tour(tour_id).await?;

    let mut times = input.start_times.clone();
    times.sort();
    times.dedup();

    let mut created = Vec::new();
    for date in input.dates() {
        for start_time in &times {
            let slot = SlotInput {
                date,
                start_time: *start_time,
                capacity: input.capacity,
                booked: 0,
            };
            validate_slot(&slot)?;
            created.push(repo.create_slot(tour_id, &slot).await?);
        }
    }
    log::info!("Created {} slots for tour {}", created.len(), tour_id);
    Ok(created)
}

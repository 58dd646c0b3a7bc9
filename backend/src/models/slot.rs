//! Availability slots.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{SlotId, TourId};

/// A departure of a tour on a given date and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: SlotId,
    pub tour_id: TourId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub capacity: u32,
    pub booked: u32,
}

impl AvailabilitySlot {
    /// Seats still available.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.booked)
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    pub fn can_accommodate(&self, participants: u32) -> bool {
        participants <= self.remaining()
    }
}

/// Fields for a new slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInput {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub capacity: u32,
    #[serde(default)]
    pub booked: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(capacity: u32, booked: u32) -> AvailabilitySlot {
        AvailabilitySlot {
            id: SlotId(1),
            tour_id: TourId(1),
            date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            capacity,
            booked,
        }
    }

    #[test]
    fn test_remaining_saturates() {
        assert_eq!(slot(10, 4).remaining(), 6);
        assert_eq!(slot(3, 5).remaining(), 0);
        assert!(slot(3, 5).is_full());
    }

    #[test]
    fn test_can_accommodate() {
        let s = slot(8, 6);
        assert!(s.can_accommodate(2));
        assert!(!s.can_accommodate(3));
    }
}

//! Bookings and their line items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingId, Language, PackageId, SlotId, TourId};

/// Lifecycle of a booking.
///
/// `Pending` holds seats while the customer pays; the payment status read back
/// from the gateway moves it to `Confirmed` or `PaymentFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    PaymentFailed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::PaymentFailed => "payment_failed",
        }
    }

    /// Whether the booking still occupies seats on its slot.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "payment_failed" => Ok(BookingStatus::PaymentFailed),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

/// What a booking line charges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingItemKind {
    Base,
    Adult,
    Child,
    Seat,
    Package,
    Upsell,
}

/// A priced line of a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingItem {
    pub kind: BookingItemKind,
    pub description: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub total: i64,
}

/// A customer booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub voucher_token: String,
    pub tour_id: TourId,
    pub slot_id: SlotId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub language: Language,
    pub adults: u32,
    pub children: u32,
    pub package_id: Option<PackageId>,
    pub status: BookingStatus,
    pub total_amount: i64,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<BookingItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn participants(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

/// Booking as handed to the repository; ids and timestamps are assigned there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub voucher_token: String,
    pub tour_id: TourId,
    pub slot_id: SlotId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub language: Language,
    pub adults: u32,
    pub children: u32,
    pub package_id: Option<PackageId>,
    pub status: BookingStatus,
    pub total_amount: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub items: Vec<BookingItem>,
}

/// Admin booking list filter. Dates apply to `created_at`, inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub tour_id: Option<TourId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        let created = booking.created_at.date_naive();
        self.status.map_or(true, |s| booking.status == s)
            && self.tour_id.map_or(true, |t| booking.tour_id == t)
            && self.from.map_or(true, |from| created >= from)
            && self.to.map_or(true, |to| created <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::PaymentFailed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
    }

    #[test]
    fn test_holds_seats() {
        assert!(BookingStatus::Pending.holds_seats());
        assert!(BookingStatus::Confirmed.holds_seats());
        assert!(!BookingStatus::Cancelled.holds_seats());
        assert!(!BookingStatus::PaymentFailed.holds_seats());
    }
}

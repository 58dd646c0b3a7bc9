//! Storefront checkout.
//!
//! ```text
//! start_checkout ──► reserve seats ──► pending booking ──► payment intent
//!                                                            │
//! confirm_payment(token) ◄── customer returns from gateway ◄─┘
//!        │
//!        ├─ succeeded → confirmed (a failed booking re-reserves its seats)
//!        ├─ canceled  → payment_failed, seats released
//!        └─ otherwise → unchanged; the customer may still retry the card
//! ```
//!
//! Seats are held from the moment checkout starts, so two customers cannot
//! pay for the last seat. The reservation itself is a single conditional
//! update in the store. Every status change goes through
//! `transition_booking_status`, and seats move only for the caller whose
//! transition took effect.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::availability::check_capacity;
use super::error::{ServiceError, ServiceResult};
use super::pricing::{quote, PriceQuote, QuoteRequest};
use crate::clients::{PaymentGateway, PaymentIntentRequest, PaymentStatus};
use crate::db::repository::{
    AvailabilityRepository, BookingRepository, FullRepository, TourRepository,
};
use crate::models::{
    localize, Booking, BookingId, BookingItem, BookingStatus, Language, NewBooking, SlotId,
    TourId,
};

/// Values checkout needs from the application configuration.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Storefront origin the customer is sent back to after paying.
    pub public_base_url: String,
    pub currency: String,
    pub default_language: Language,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".to_string(),
            currency: "EUR".to_string(),
            default_language: Language::En,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub tour_id: TourId,
    pub slot_id: SlotId,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(flatten)]
    pub selection: QuoteRequest,
    #[serde(default)]
    pub notes: Option<String>,
}

/// What the storefront needs to hand the customer to the payment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub booking_id: BookingId,
    pub voucher_token: String,
    pub client_secret: String,
    pub return_url: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub voucher_token: String,
    pub booking_id: BookingId,
    pub customer_name: String,
    pub language: Language,
    pub tour_title: String,
    pub tour_slug: String,
    pub meeting_point: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub adults: u32,
    pub children: u32,
    pub items: Vec<BookingItem>,
    pub total_amount: i64,
    pub currency: String,
}

fn validate_contact(request: &CheckoutRequest) -> ServiceResult<()> {
    let name = request.customer_name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Customer name is required"));
    }
    if name.chars().count() > 200 {
        return Err(ServiceError::validation("Customer name is too long"));
    }
    if !is_valid_email(request.customer_email.trim()) {
        return Err(ServiceError::validation(format!(
            "Invalid email address: {}",
            request.customer_email
        )));
    }
    if let Some(phone) = request.customer_phone.as_deref() {
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        let allowed = phone
            .chars()
            .all(|c| c.is_ascii_digit() || " +-().".contains(c));
        if !phone.trim().is_empty() && (!allowed || digits < 6) {
            return Err(ServiceError::validation(format!(
                "Invalid phone number: {}",
                phone
            )));
        }
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub fn return_url(settings: &CheckoutSettings, language: Language, token: &str) -> String {
    format!(
        "{}/{}/booking/confirmation?token={}",
        settings.public_base_url.trim_end_matches('/'),
        language.code(),
        token
    )
}

/// Price `selection` against the stored pricing, packages and upsells of a
/// tour.
pub async fn quote_tour<R>(
    repo: &R,
    tour_id: TourId,
    selection: &QuoteRequest,
    currency: &str,
) -> ServiceResult<PriceQuote>
where
    R: TourRepository + ?Sized,
{
    let pricing = repo.get_pricing(tour_id).await?.ok_or_else(|| {
        ServiceError::conflict(format!("Tour {} has no pricing configured", tour_id))
    })?;
    let package = match selection.package_id {
        Some(package_id) => repo
            .list_packages(tour_id)
            .await?
            .into_iter()
            .find(|p| p.id == package_id),
        None => None,
    };
    let upsells = repo.list_upsells(tour_id).await?;
    quote(&pricing.config, selection, package.as_ref(), &upsells, currency)
}

/// Reserve seats, create a pending booking and open a payment intent for it.
pub async fn start_checkout<R>(
    repo: &R,
    payments: &dyn PaymentGateway,
    settings: &CheckoutSettings,
    request: &CheckoutRequest,
) -> ServiceResult<CheckoutSession>
where
    R: FullRepository + ?Sized,
{
    validate_contact(request)?;
    let language = request.language.unwrap_or(settings.default_language);

    let tour = repo.get_tour(request.tour_id).await?;
    if !tour.published {
        return Err(ServiceError::not_found(format!(
            "Tour {} not found",
            request.tour_id
        )));
    }

    let slot = repo.get_slot(request.slot_id).await?;
    if slot.tour_id != tour.id {
        return Err(ServiceError::validation(format!(
            "Slot {} does not belong to tour {}",
            slot.id, tour.id
        )));
    }
    if slot.date < Utc::now().date_naive() {
        return Err(ServiceError::validation("This departure is in the past"));
    }
    let participants = request.selection.participants.total()?;
    check_capacity(&slot, participants)?;

    let price = quote_tour(repo, tour.id, &request.selection, &settings.currency).await?;

    repo.reserve_seats(slot.id, participants).await?;

    let new_booking = NewBooking {
        voucher_token: uuid::Uuid::new_v4().to_string(),
        tour_id: tour.id,
        slot_id: slot.id,
        customer_name: request.customer_name.trim().to_string(),
        customer_email: request.customer_email.trim().to_lowercase(),
        customer_phone: request
            .customer_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        language,
        adults: request.selection.participants.adults,
        children: request.selection.participants.children,
        package_id: request.selection.package_id,
        status: BookingStatus::Pending,
        total_amount: price.total,
        currency: price.currency.clone(),
        notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
        items: price.lines,
    };
    let booking = match repo.create_booking(&new_booking).await {
        Ok(booking) => booking,
        Err(err) => {
            release_quietly(repo, slot.id, participants).await;
            return Err(err.into());
        }
    };

    let mut metadata = BTreeMap::new();
    metadata.insert("booking_id".to_string(), booking.id.to_string());
    metadata.insert("voucher_token".to_string(), booking.voucher_token.clone());
    let intent_request = PaymentIntentRequest {
        amount: booking.total_amount,
        currency: booking.currency.to_lowercase(),
        description: format!("Booking {} for {}", booking.id, tour.slug),
        metadata,
    };
    let intent = match payments.create_intent(&intent_request).await {
        Ok(intent) => intent,
        Err(err) => {
            log::error!(
                "Payment intent creation failed for booking {}: {}",
                booking.id,
                err
            );
            fail_booking(repo, &booking).await;
            return Err(ServiceError::Payment(err));
        }
    };
    if let Err(err) = repo.set_payment_intent(booking.id, &intent.id).await {
        log::error!(
            "Failed to attach payment {} to booking {}: {}",
            intent.id,
            booking.id,
            err
        );
        fail_booking(repo, &booking).await;
        return Err(err.into());
    }

    log::info!(
        "Checkout started: booking {} ({} seats on slot {}, {} {})",
        booking.id,
        participants,
        slot.id,
        booking.total_amount,
        booking.currency
    );

    Ok(CheckoutSession {
        booking_id: booking.id,
        return_url: return_url(settings, language, &booking.voucher_token),
        voucher_token: booking.voucher_token,
        client_secret: intent.client_secret,
        amount: booking.total_amount,
        currency: booking.currency,
    })
}

async fn release_quietly<R>(repo: &R, slot_id: SlotId, seats: u32)
where
    R: AvailabilityRepository + ?Sized,
{
    if let Err(err) = repo.release_seats(slot_id, seats).await {
        log::error!("Failed to release {} seats on slot {}: {}", seats, slot_id, err);
    }
}

async fn fail_booking<R>(repo: &R, booking: &Booking)
where
    R: AvailabilityRepository + BookingRepository + ?Sized,
{
    match repo
        .transition_booking_status(booking.id, BookingStatus::Pending, BookingStatus::PaymentFailed)
        .await
    {
        Ok(Some(_)) => release_quietly(repo, booking.slot_id, booking.participants()).await,
        Ok(None) => {}
        Err(err) => log::error!("Failed to mark booking {} as failed: {}", booking.id, err),
    }
}

/// Read the payment status back from the gateway and settle the booking.
///
/// Safe to call repeatedly and concurrently for the same token.
pub async fn confirm_payment<R>(
    repo: &R,
    payments: &dyn PaymentGateway,
    token: &str,
) -> ServiceResult<Booking>
where
    R: FullRepository + ?Sized,
{
    let booking = repo.get_booking_by_token(token).await?;
    let intent_id = match (booking.status, booking.payment_intent_id.clone()) {
        (BookingStatus::Pending, None) => {
            return Err(ServiceError::conflict(format!(
                "Booking {} has no payment in progress",
                booking.id
            )))
        }
        (BookingStatus::Pending | BookingStatus::PaymentFailed, Some(intent_id)) => intent_id,
        _ => return Ok(booking),
    };

    let intent = payments
        .retrieve_intent(&intent_id)
        .await
        .map_err(ServiceError::Payment)?;

    match intent.status {
        PaymentStatus::Succeeded => {
            if intent.amount != booking.total_amount {
                log::warn!(
                    "Payment {} amount {} differs from booking {} total {}",
                    intent.id,
                    intent.amount,
                    booking.id,
                    booking.total_amount
                );
            }
            settle_succeeded(repo, booking).await
        }
        status if status.is_failed() => {
            match repo
                .transition_booking_status(
                    booking.id,
                    BookingStatus::Pending,
                    BookingStatus::PaymentFailed,
                )
                .await?
            {
                Some(failed) => {
                    repo.release_seats(failed.slot_id, failed.participants())
                        .await?;
                    log::info!("Booking {} payment failed ({:?})", failed.id, status);
                    Ok(failed)
                }
                None => Ok(repo.get_booking(booking.id).await?),
            }
        }
        _ => Ok(booking),
    }
}

async fn settle_succeeded<R>(repo: &R, booking: Booking) -> ServiceResult<Booking>
where
    R: AvailabilityRepository + BookingRepository + ?Sized,
{
    if let Some(confirmed) = repo
        .transition_booking_status(booking.id, BookingStatus::Pending, BookingStatus::Confirmed)
        .await?
    {
        log::info!("Booking {} confirmed", confirmed.id);
        return Ok(confirmed);
    }

    let current = repo.get_booking(booking.id).await?;
    if current.status != BookingStatus::PaymentFailed {
        return Ok(current);
    }

    // Paid after the booking was given up: take the seats back first.
    let seats = current.participants();
    if let Err(err) = repo.reserve_seats(current.slot_id, seats).await {
        log::warn!(
            "Booking {} was paid but slot {} can no longer hold {} seats: {}",
            current.id,
            current.slot_id,
            seats,
            err
        );
        return Err(err.into());
    }
    match repo
        .transition_booking_status(current.id, BookingStatus::PaymentFailed, BookingStatus::Confirmed)
        .await
    {
        Ok(Some(confirmed)) => {
            log::info!("Booking {} confirmed after a failed attempt", confirmed.id);
            Ok(confirmed)
        }
        Ok(None) => {
            release_quietly(repo, current.slot_id, seats).await;
            Ok(repo.get_booking(current.id).await?)
        }
        Err(err) => {
            release_quietly(repo, current.slot_id, seats).await;
            Err(err.into())
        }
    }
}

/// Voucher for a confirmed booking.
pub async fn voucher<R>(
    repo: &R,
    token: &str,
    default_language: Language,
) -> ServiceResult<Voucher>
where
    R: TourRepository + AvailabilityRepository + BookingRepository + ?Sized,
{
    let booking = repo.get_booking_by_token(token).await?;
    if booking.status != BookingStatus::Confirmed {
        return Err(ServiceError::conflict(format!(
            "Booking is {}, vouchers are issued for confirmed bookings only",
            booking.status.as_str()
        )));
    }
    let tour = repo.get_tour(booking.tour_id).await?;
    let slot = repo.get_slot(booking.slot_id).await?;
    let tour_title = localize(&tour.translations, booking.language, default_language)
        .map(|(_, text)| text.title.clone())
        .unwrap_or_else(|| tour.slug.clone());

    Ok(Voucher {
        voucher_token: booking.voucher_token,
        booking_id: booking.id,
        customer_name: booking.customer_name,
        language: booking.language,
        tour_title,
        tour_slug: tour.slug,
        meeting_point: tour.meeting_point,
        date: slot.date,
        start_time: slot.start_time,
        adults: booking.adults,
        children: booking.children,
        items: booking.items,
        total_amount: booking.total_amount,
        currency: booking.currency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, phone: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            tour_id: TourId(1),
            slot_id: SlotId(1),
            customer_name: "Ana".to_string(),
            customer_email: email.to_string(),
            customer_phone: phone.map(str::to_string),
            language: None,
            selection: QuoteRequest::default(),
            notes: None,
        }
    }

    #[test]
    fn test_contact_validation() {
        assert!(validate_contact(&request("ana@example.com", None)).is_ok());
        assert!(validate_contact(&request("ana@example.com", Some("+34 600-123-456"))).is_ok());
        assert!(validate_contact(&request("ana@example.com", Some(""))).is_ok());
        assert!(validate_contact(&request("ana@example.com", Some("call me"))).is_err());
        assert!(validate_contact(&request("ana.example.com", None)).is_err());
        assert!(validate_contact(&request("ana@localhost", None)).is_err());
        assert!(validate_contact(&request("a na@example.com", None)).is_err());

        let mut nameless = request("ana@example.com", None);
        nameless.customer_name = "  ".to_string();
        assert!(validate_contact(&nameless).is_err());
    }

    #[test]
    fn test_return_url() {
        let settings = CheckoutSettings {
            public_base_url: "https://tours.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            return_url(&settings, Language::Es, "abc"),
            "https://tours.example.com/es/booking/confirmation?token=abc"
        );
    }

    #[test]
    fn test_checkout_request_json_shape() {
        let json = r#"{
            "tour_id": 3, "slot_id": 7,
            "customer_name": "Ana", "customer_email": "ana@example.com",
            "language": "fr", "adults": 2, "children": 1,
            "upsells": [{"upsell_id": 4}]
        }"#;
        let req: CheckoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.selection.participants.total().unwrap(), 3);
        assert_eq!(req.selection.upsells[0].quantity, 1);
        assert_eq!(req.language, Some(Language::Fr));
    }
}

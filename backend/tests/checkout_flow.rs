//! End-to-end checkout against the in-memory repository and the mock payment
//! gateway.

mod support;

use tour_booking::clients::{MockPaymentGateway, PaymentGateway, PaymentStatus};
use tour_booking::db::repository::{AvailabilityRepository, BookingRepository};
use tour_booking::db::LocalRepository;
use tour_booking::models::{BookingItemKind, BookingStatus, Language};
use tour_booking::services::{
    bookings, checkout, CheckoutRequest, CheckoutSettings, Participants, QuoteRequest,
    ServiceError, UpsellSelection,
};

use support::{seed_tour, TourFixture};

fn checkout_request(fixture: &TourFixture, adults: u32, children: u32) -> CheckoutRequest {
    CheckoutRequest {
        tour_id: fixture.tour.id,
        slot_id: fixture.slot.id,
        customer_name: " Ana García ".to_string(),
        customer_email: "Ana@Example.com".to_string(),
        customer_phone: Some("+34 600 123 456".to_string()),
        language: Some(Language::Es),
        selection: QuoteRequest {
            participants: Participants { adults, children },
            package_id: None,
            upsells: vec![UpsellSelection {
                upsell_id: fixture.upsell.id,
                quantity: 1,
            }],
        },
        notes: None,
    }
}

async fn intent_of(repo: &LocalRepository, booking_id: tour_booking::models::BookingId) -> String {
    repo.get_booking(booking_id)
        .await
        .unwrap()
        .payment_intent_id
        .expect("payment intent attached")
}

#[tokio::test]
async fn test_checkout_reserves_seats_and_prices_lines() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;

    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 1),
    )
    .await
    .unwrap();

    // 2 × 3000 + 1 × 1500 + tapas 1200 × 3 people
    assert_eq!(session.amount, 11_100);
    assert_eq!(session.currency, "EUR");
    assert!(session.client_secret.ends_with("_secret"));
    assert_eq!(
        session.return_url,
        format!(
            "http://localhost:3000/es/booking/confirmation?token={}",
            session.voucher_token
        )
    );

    let slot = repo.get_slot(fixture.slot.id).await.unwrap();
    assert_eq!(slot.booked, 3);

    let booking = repo.get_booking(session.booking_id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.customer_name, "Ana García");
    assert_eq!(booking.customer_email, "ana@example.com");
    let kinds: Vec<_> = booking.items.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BookingItemKind::Adult,
            BookingItemKind::Child,
            BookingItemKind::Upsell
        ]
    );
}

#[tokio::test]
async fn test_confirmed_payment_produces_voucher() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 0),
    )
    .await
    .unwrap();

    // Not confirmed yet: no voucher.
    let err = checkout::voucher(&repo, &session.voucher_token, Language::En)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let intent_id = intent_of(&repo, session.booking_id).await;
    assert!(payments.set_status(&intent_id, PaymentStatus::Succeeded));

    let booking = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    // Confirming twice is a no-op.
    let again = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(again.status, BookingStatus::Confirmed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 2);

    let voucher = checkout::voucher(&repo, &session.voucher_token, Language::En)
        .await
        .unwrap();
    assert_eq!(voucher.tour_title, "Paseo por el casco antiguo");
    assert_eq!(voucher.date, fixture.slot.date);
    assert_eq!(voucher.meeting_point.as_deref(), Some("Plaza Mayor"));
    assert_eq!(voucher.total_amount, session.amount);
}

#[tokio::test]
async fn test_failed_payment_releases_seats() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 3, 0),
    )
    .await
    .unwrap();
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 3);

    let intent_id = intent_of(&repo, session.booking_id).await;
    payments.set_status(&intent_id, PaymentStatus::Canceled);

    let booking = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::PaymentFailed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);
}

#[tokio::test]
async fn test_processing_payment_leaves_booking_pending() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 1, 0),
    )
    .await
    .unwrap();
    let intent_id = intent_of(&repo, session.booking_id).await;
    payments.set_status(&intent_id, PaymentStatus::Processing);

    let booking = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 1);
}

#[tokio::test]
async fn test_gateway_outage_marks_booking_failed() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    payments.fail_next_creates(true);
    let fixture = seed_tour(&repo).await;

    let err = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Payment(_)));

    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);
    let all = repo.list_bookings(&Default::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, BookingStatus::PaymentFailed);
}

#[tokio::test]
async fn test_overbooking_is_a_conflict() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;

    checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 8, 0),
    )
    .await
    .unwrap();

    let err = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 3, 0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(payments.intent_count(), 1);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 8);
}

#[tokio::test]
async fn test_invalid_contact_rejected_before_reserving() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let mut request = checkout_request(&fixture, 2, 0);
    request.customer_email = "not-an-email".to_string();

    let err = checkout::start_checkout(&repo, &payments, &CheckoutSettings::default(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);
    assert_eq!(repo.booking_count(), 0);
}

#[tokio::test]
async fn test_package_over_capacity_rejected() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let mut request = checkout_request(&fixture, 5, 0);
    request.selection.package_id = Some(fixture.package.id);

    let err = checkout::start_checkout(&repo, &payments, &CheckoutSettings::default(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_admin_cancel_releases_once_and_reconfirm_reserves() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 4, 0),
    )
    .await
    .unwrap();

    let cancelled = bookings::cancel_booking(&repo, session.booking_id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);

    bookings::cancel_booking(&repo, session.booking_id)
        .await
        .unwrap();
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);

    let restored = bookings::change_status(&repo, session.booking_id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(restored.status, BookingStatus::Confirmed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 4);

    let detail = bookings::booking_detail(&repo, session.booking_id, Language::En)
        .await
        .unwrap();
    assert_eq!(detail.tour_title, "Paseo por el casco antiguo");
}

#[tokio::test]
async fn test_confirm_before_paying_keeps_booking_open() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 0),
    )
    .await
    .unwrap();

    // The intent still waits for a card, or the first card was declined.
    let early = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(early.status, BookingStatus::Pending);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 2);

    let intent_id = intent_of(&repo, session.booking_id).await;
    payments.set_status(&intent_id, PaymentStatus::Succeeded);
    let paid = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(paid.status, BookingStatus::Confirmed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 2);
}

#[tokio::test]
async fn test_payment_succeeding_after_failure_reclaims_seats() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 0),
    )
    .await
    .unwrap();
    let intent_id = intent_of(&repo, session.booking_id).await;

    payments.set_status(&intent_id, PaymentStatus::Canceled);
    let failed = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(failed.status, BookingStatus::PaymentFailed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);

    payments.set_status(&intent_id, PaymentStatus::Succeeded);
    let confirmed = checkout::confirm_payment(&repo, &payments, &session.voucher_token)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 2);
}

#[tokio::test]
async fn test_late_payment_on_full_slot_is_a_conflict() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let late = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 3, 0),
    )
    .await
    .unwrap();
    let intent_id = intent_of(&repo, late.booking_id).await;
    payments.set_status(&intent_id, PaymentStatus::Canceled);
    checkout::confirm_payment(&repo, &payments, &late.voucher_token)
        .await
        .unwrap();

    checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 8, 0),
    )
    .await
    .unwrap();

    payments.set_status(&intent_id, PaymentStatus::Succeeded);
    let err = checkout::confirm_payment(&repo, &payments, &late.voucher_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(
        repo.get_booking(late.booking_id).await.unwrap().status,
        BookingStatus::PaymentFailed
    );
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 8);
}

#[tokio::test]
async fn test_concurrent_confirms_release_seats_once() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;

    let kept = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 3, 0),
    )
    .await
    .unwrap();
    let kept_intent = intent_of(&repo, kept.booking_id).await;
    payments.set_status(&kept_intent, PaymentStatus::Succeeded);
    checkout::confirm_payment(&repo, &payments, &kept.voucher_token)
        .await
        .unwrap();

    let dropped = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 0),
    )
    .await
    .unwrap();
    let dropped_intent = intent_of(&repo, dropped.booking_id).await;
    payments.set_status(&dropped_intent, PaymentStatus::Canceled);

    let (first, second) = tokio::join!(
        checkout::confirm_payment(&repo, &payments, &dropped.voucher_token),
        checkout::confirm_payment(&repo, &payments, &dropped.voucher_token),
    );
    assert_eq!(first.unwrap().status, BookingStatus::PaymentFailed);
    assert_eq!(second.unwrap().status, BookingStatus::PaymentFailed);
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 3);
}

#[tokio::test]
async fn test_failure_attaching_intent_releases_seats() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    repo.set_failing_operation("set_payment_intent", true);

    let err = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 2, 0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Repository(_)));
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);
    let all = repo.list_bookings(&Default::default()).await.unwrap();
    assert_eq!(all[0].status, BookingStatus::PaymentFailed);
}

#[tokio::test]
async fn test_failed_status_change_returns_reserved_seats() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let session = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, 4, 0),
    )
    .await
    .unwrap();
    bookings::cancel_booking(&repo, session.booking_id)
        .await
        .unwrap();

    repo.set_failing_operation("transition_booking_status", true);
    assert!(bookings::change_status(&repo, session.booking_id, BookingStatus::Confirmed)
        .await
        .is_err());
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);

    repo.set_failing_operation("transition_booking_status", false);
    bookings::change_status(&repo, session.booking_id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 4);
}

#[tokio::test]
async fn test_oversized_party_rejected_without_reserving() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;

    let err = checkout::start_checkout(
        &repo,
        &payments,
        &CheckoutSettings::default(),
        &checkout_request(&fixture, u32::MAX, 1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(repo.get_slot(fixture.slot.id).await.unwrap().booked, 0);
}

#[tokio::test]
async fn test_booking_detail_falls_back_to_store_language() {
    let repo = LocalRepository::new();
    let payments = MockPaymentGateway::new();
    let fixture = seed_tour(&repo).await;
    let mut request = checkout_request(&fixture, 1, 0);
    request.language = Some(Language::Fr);
    let session =
        checkout::start_checkout(&repo, &payments, &CheckoutSettings::default(), &request)
            .await
            .unwrap();

    let detail = bookings::booking_detail(&repo, session.booking_id, Language::Es)
        .await
        .unwrap();
    assert_eq!(detail.tour_title, "Paseo por el casco antiguo");
}

#[tokio::test]
async fn test_mock_gateway_reports_unknown_intent() {
    let payments = MockPaymentGateway::new();
    assert!(payments.retrieve_intent("pi_missing").await.is_err());
}

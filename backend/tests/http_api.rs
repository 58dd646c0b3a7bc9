//! Router-level tests: status codes, auth and JSON shapes.

mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tour_booking::clients::{MockPaymentGateway, PaymentStatus, StaticSessionVerifier};
use tour_booking::db::repository::{BookingRepository, UserRepository};
use tour_booking::db::{FullRepository, LocalRepository};
use tour_booking::http::{create_router, AppState};
use tour_booking::models::{BookingStatus, UserProfile, UserRole};

use support::{seed_tour, TourFixture};

const ADMIN_TOKEN: &str = "admin-token";
const CUSTOMER_TOKEN: &str = "customer-token";

struct TestApp {
    router: Router,
    repo: Arc<LocalRepository>,
    payments: Arc<MockPaymentGateway>,
    fixture: TourFixture,
}

async fn app() -> TestApp {
    let repo = Arc::new(LocalRepository::new());
    let fixture = seed_tour(&repo).await;
    for (user_id, role) in [("admin-1", UserRole::Admin), ("customer-1", UserRole::Customer)] {
        repo.upsert_user(&UserProfile {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            role,
        })
        .await
        .unwrap();
    }

    let payments = Arc::new(MockPaymentGateway::new());
    let verifier = StaticSessionVerifier::default()
        .with_token(ADMIN_TOKEN, "admin-1")
        .with_token(CUSTOMER_TOKEN, "customer-1");
    let state = AppState::new(repo.clone() as Arc<dyn FullRepository>)
        .with_payments(payments.clone())
        .with_verifier(Arc::new(verifier));

    TestApp {
        router: create_router(state),
        repo,
        payments,
        fixture,
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_tour_list_is_localized() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/v1/tours?lang=es", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Paseo por el casco antiguo");
    assert_eq!(body["items"][0]["language"], "es");
    assert_eq!(body["items"][0]["from_price"], 1500);
}

#[tokio::test]
async fn test_unknown_tour_is_404_json() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/v1/tours/no-such-tour", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bad_query_is_400() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/v1/tours?lang=xx", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_availability_and_quote() {
    let app = app().await;
    let id = app.fixture.tour.id;

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/v1/tours/{}/availability", id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["capacity"], 10);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/v1/tours/{}/quote", id),
            None,
            Some(json!({"adults": 2, "children": 2})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 9000);
    assert_eq!(body["currency"], "EUR");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/v1/tours/{}/quote", id),
            None,
            Some(json!({"adults": 0, "children": 2})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_window_and_oversized_quote_are_400() {
    let app = app().await;
    let id = app.fixture.tour.id;

    let availability = |to: &str| {
        request(
            Method::GET,
            &format!("/v1/tours/{}/availability?from=2030-01-01&to={}", id, to),
            None,
            None,
        )
    };
    let (status, _) = send(&app, availability("2031-01-01")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, availability("2031-01-02")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/v1/tours/{}/quote", id),
            None,
            Some(json!({"adults": u32::MAX, "children": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = app().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_checkout_confirm_and_voucher() {
    let app = app().await;
    let payload = json!({
        "tour_id": app.fixture.tour.id,
        "slot_id": app.fixture.slot.id,
        "customer_name": "Ana",
        "customer_email": "ana@example.com",
        "language": "en",
        "adults": 2,
        "upsells": [{"upsell_id": app.fixture.upsell.id}]
    });
    let (status, session) = send(&app, request(Method::POST, "/v1/checkout", None, Some(payload))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["amount"], 2 * 3000 + 2 * 1200);
    let token = session["voucher_token"].as_str().unwrap().to_string();
    assert!(session["return_url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/en/booking/confirmation?token={}", token)));

    let (status, _) = send(&app, request(Method::GET, &format!("/v1/vouchers/{}", token), None, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let booking_id = tour_booking::models::BookingId(session["booking_id"].as_i64().unwrap());
    let intent = app
        .repo
        .get_booking(booking_id)
        .await
        .unwrap()
        .payment_intent_id
        .unwrap();
    app.payments.set_status(&intent, PaymentStatus::Succeeded);

    let (status, booking) = send(
        &app,
        request(Method::POST, &format!("/v1/checkout/{}/confirm", token), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "confirmed");

    let (status, voucher) = send(&app, request(Method::GET, &format!("/v1/vouchers/{}", token), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voucher["tour_title"], "Old Town Walk");
    assert_eq!(voucher["adults"], 2);
}

#[tokio::test]
async fn test_unknown_voucher_is_404() {
    let app = app().await;
    let (status, _) = send(&app, request(Method::GET, "/v1/vouchers/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_requires_admin_role() {
    let app = app().await;

    let (status, body) = send(&app, request(Method::GET, "/v1/admin/tours", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, request(Method::GET, "/v1/admin/tours", Some("bogus"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, request(Method::GET, "/v1/admin/tours", Some(CUSTOMER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(&app, request(Method::GET, "/v1/admin/me", Some(ADMIN_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "admin-1");
}

#[tokio::test]
async fn test_admin_category_crud_and_conflict() {
    let app = app().await;
    let category = json!({"slug": "food", "name": "Food tours"});

    let (status, created) = send(
        &app,
        request(Method::POST, "/v1/admin/categories", Some(ADMIN_TOKEN), Some(category.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        request(Method::POST, "/v1/admin/categories", Some(ADMIN_TOKEN), Some(category)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        request(Method::POST, "/v1/admin/categories", Some(ADMIN_TOKEN), Some(json!({"slug": "Bad Slug", "name": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/v1/admin/categories/{}", id), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, request(Method::GET, "/v1/categories", None, None)).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_admin_tour_lifecycle() {
    let app = app().await;
    let tour = json!({
        "slug": "night-tapas",
        "translations": {"en": {"title": "Night Tapas"}},
        "duration_minutes": 180
    });
    let (status, created) = send(&app, request(Method::POST, "/v1/admin/tours", Some(ADMIN_TOKEN), Some(tour))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["published"], false);
    let id = created["id"].as_i64().unwrap();

    // Unpublished tours stay off the storefront.
    let (status, _) = send(&app, request(Method::GET, "/v1/tours/night-tapas", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, pricing) = send(
        &app,
        request(
            Method::PUT,
            &format!("/v1/admin/tours/{}/pricing", id),
            Some(ADMIN_TOKEN),
            Some(json!({"type": "flat_per_person", "price_per_person": 4500})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pricing["config"]["price_per_person"], 4500);

    let (status, slots) = send(
        &app,
        request(
            Method::POST,
            &format!("/v1/admin/tours/{}/slots/bulk", id),
            Some(ADMIN_TOKEN),
            Some(json!({
                "from": support::next_week(),
                "to": support::next_week(),
                "start_times": ["20:00:00", "18:00:00"],
                "capacity": 12
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(slots["total"], 2);

    let (status, view) = send(
        &app,
        request(Method::GET, &format!("/v1/admin/tours/{}", id), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["tour"]["slug"], "night-tapas");

    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/v1/admin/tours/{}", id), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_booking_status_change() {
    let app = app().await;
    let payload = json!({
        "tour_id": app.fixture.tour.id,
        "slot_id": app.fixture.slot.id,
        "customer_name": "Luc",
        "customer_email": "luc@example.com",
        "adults": 3
    });
    let (_, session) = send(&app, request(Method::POST, "/v1/checkout", None, Some(payload))).await;
    let booking_id = session["booking_id"].as_i64().unwrap();

    let (status, list) = send(
        &app,
        request(Method::GET, "/v1/admin/bookings?status=pending", Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, booking) = send(
        &app,
        request(
            Method::PUT,
            &format!("/v1/admin/bookings/{}/status", booking_id),
            Some(ADMIN_TOKEN),
            Some(json!({"status": "cancelled"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "cancelled");

    let stored = app
        .repo
        .get_booking(tour_booking::models::BookingId(booking_id))
        .await
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);

    let (status, detail) = send(
        &app,
        request(Method::GET, &format!("/v1/admin/bookings/{}", booking_id), Some(ADMIN_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["slot"]["booked"], 0);
}

#[tokio::test]
async fn test_admin_upload() {
    let app = app().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/admin/uploads?folder=tours&filename=Plaza%20Mayor.png")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vec![0x89, b'P', b'N', b'G']))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["size"], 4);
    assert!(body["path"].as_str().unwrap().starts_with("tours/"));
    assert!(body["url"].as_str().unwrap().ends_with("plaza-mayor.png"));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/admin/uploads?filename=script.sh")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .header(header::CONTENT_TYPE, "application/x-sh")
        .body(Body::from("echo hi"))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_visits_feed_the_dashboard() {
    let app = app().await;
    for session in ["s1", "s1", "s2"] {
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/v1/analytics/visits",
                None,
                Some(json!({"path": "/es/tours/old-town-walk", "session_id": session, "language": "es"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/v1/analytics/visits",
            None,
            Some(json!({"path": "no-slash", "session_id": "s3"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = send(&app, request(Method::GET, "/v1/admin/dashboard?days=7", Some(ADMIN_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_visits"], 3);
    assert_eq!(summary["unique_sessions"], 2);
    assert_eq!(summary["top_pages"][0]["path"], "/es/tours/old-town-walk");
}

#[tokio::test]
async fn test_admin_translate_text_with_mock() {
    let app = app().await;
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/admin/translate",
            Some(ADMIN_TOKEN),
            Some(json!({"text": "Hello", "source": "en", "targets": ["es", "fr"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["translations"].as_array().unwrap().len(), 2);
    assert_eq!(body["translations"][0]["language"], "es");
}

#[tokio::test]
async fn test_static_page_roundtrip() {
    let app = app().await;
    let (status, page) = send(
        &app,
        request(
            Method::POST,
            "/v1/admin/pages",
            Some(ADMIN_TOKEN),
            Some(json!({"slug": "about", "published": true, "translations": {"en": {"title": "About us", "body": "We walk."}}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = page["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            &format!("/v1/admin/pages/{}/translations/de", id),
            Some(ADMIN_TOKEN),
            Some(json!({"title": "Über uns", "body": "Wir laufen."})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, localized) = send(&app, request(Method::GET, "/v1/pages/about?lang=de", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(localized["content"]["title"], "Über uns");

    // French falls back to the default language.
    let (_, localized) = send(&app, request(Method::GET, "/v1/pages/about?lang=fr", None, None)).await;
    assert_eq!(localized["language"], "en");
}

//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, admin, public};
use super::state::AppState;

/// Headroom on top of the upload limit for JSON bodies and multipart framing.
const BODY_LIMIT_MARGIN: usize = 64 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(admin::me))
        .route("/users/{user}", put(admin::upsert_user))
        // Tours and their parts
        .route("/tours", get(admin::list_tours).post(admin::create_tour))
        .route(
            "/tours/{tour}",
            get(admin::get_tour)
                .put(admin::update_tour)
                .delete(admin::delete_tour),
        )
        .route("/tours/{tour}/blocks", put(admin::upsert_block))
        .route("/tours/{tour}/pricing", put(admin::set_pricing))
        .route("/tours/{tour}/upsells", post(admin::create_upsell))
        .route("/tours/{tour}/packages", post(admin::create_package))
        .route(
            "/tours/{tour}/slots",
            get(admin::list_slots).post(admin::create_slot),
        )
        .route("/tours/{tour}/slots/bulk", post(admin::create_slots_bulk))
        .route("/blocks/{block}", delete(admin::delete_block))
        .route(
            "/upsells/{upsell}",
            put(admin::update_upsell).delete(admin::delete_upsell),
        )
        .route("/packages/{package}", delete(admin::delete_package))
        .route("/slots/{slot}", delete(admin::delete_slot))
        // Bookings
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{booking}", get(admin::get_booking))
        .route("/bookings/{booking}/status", put(admin::update_booking_status))
        .route("/bookings/{booking}/notes", put(admin::update_booking_notes))
        // Pages
        .route("/pages", get(admin::list_pages).post(admin::create_page))
        .route(
            "/pages/{page}",
            get(admin::get_page)
                .put(admin::update_page)
                .delete(admin::delete_page),
        )
        .route(
            "/pages/{page}/translations/{lang}",
            put(admin::upsert_page_translation),
        )
        // Taxonomy
        .route("/categories", post(admin::create_category))
        .route(
            "/categories/{category}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route("/labels", post(admin::create_label))
        .route(
            "/labels/{label}",
            put(admin::update_label).delete(admin::delete_label),
        )
        // Tooling
        .route("/uploads", post(admin::upload))
        .route("/dashboard", get(admin::dashboard))
        .route("/translate", post(admin::translate_text))
        .route("/translate/blocks/{block}", post(admin::translate_block))
        .route("/translate/pages/{page}", post(admin::translate_page))
        .route("/translate/tours/{tour}", post(admin::translate_tour))
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = state.config.uploads.max_bytes + BODY_LIMIT_MARGIN;

    // Tour routes share one parameter name: the storefront addresses a tour
    // by slug, the id-based routes below it by numeric id.
    let api_v1 = Router::new()
        .route("/tours", get(public::list_tours))
        .route("/tours/{tour}", get(public::get_tour))
        .route("/tours/{tour}/availability", get(public::get_availability))
        .route("/tours/{tour}/quote", post(public::quote_tour))
        .route("/categories", get(public::list_categories))
        .route("/labels", get(public::list_labels))
        .route("/checkout", post(public::start_checkout))
        .route("/checkout/{token}/confirm", post(public::confirm_checkout))
        .route("/vouchers/{token}", get(public::get_voucher))
        .route("/pages/{slug}", get(public::get_page))
        .route("/analytics/visits", post(public::record_visit))
        .nest("/admin", admin_routes());

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::FullRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn FullRepository>;
        create_router(AppState::new(repo))
    }

    #[tokio::test]
    async fn health_reports_connected_store() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = router()
            .oneshot(Request::get("/v2/tours").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_routes_require_a_session() {
        let response = router()
            .oneshot(Request::get("/v1/admin/tours").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn invalid_cors_origins_are_skipped() {
        let _layer = cors_layer(&["https://shop.example".to_string(), "bad\norigin".to_string()]);
    }
}

//! Storefront endpoints.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Days;

use super::{today, HandlerResult};
use crate::http::dto::{
    DateRangeQuery, LangQuery, ListResponse, LocalizedPage, TourDetail, TourListQuery,
    TourSummary, VisitRequest,
};
use crate::http::error::AppError;
use crate::http::state::AppState;
use crate::models::{
    AvailabilitySlot, Booking, Category, Language, NewPageVisit, SpecialLabel, TourFilter, TourId,
};
use crate::services::{
    analytics, availability, catalog, checkout, pages, CheckoutRequest, CheckoutSession,
    PriceQuote, QuoteRequest, Voucher,
};

/// Default availability window when the client gives no end date.
const AVAILABILITY_WINDOW_DAYS: u64 = 90;

fn lang_or_default(state: &AppState, lang: Option<Language>) -> Language {
    lang.unwrap_or(state.config.store.default_language)
}

// =============================================================================
// Catalog
// =============================================================================

/// GET /v1/tours?lang&category&label
pub async fn list_tours(
    State(state): State<AppState>,
    query: Result<Query<TourListQuery>, QueryRejection>,
) -> HandlerResult<ListResponse<TourSummary>> {
    let Query(query) = query?;
    let filter = TourFilter {
        published_only: true,
        category_id: query.category,
        label_id: query.label,
    };
    let lang = lang_or_default(&state, query.lang);
    let tours = catalog::list_tours(
        state.repository.as_ref(),
        filter,
        lang,
        &state.config.catalog_settings(),
    )
    .await?;
    Ok(Json(tours.into()))
}

/// GET /v1/tours/{slug}?lang
pub async fn get_tour(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<LangQuery>, QueryRejection>,
) -> HandlerResult<TourDetail> {
    let Query(query) = query?;
    let lang = lang_or_default(&state, query.lang);
    let detail = catalog::tour_detail(
        state.repository.as_ref(),
        &slug,
        lang,
        true,
        &state.config.catalog_settings(),
    )
    .await?;
    Ok(Json(detail))
}

async fn published_tour(state: &AppState, tour_id: TourId) -> Result<(), AppError> {
    let tour = state.repository.get_tour(tour_id).await?;
    if !tour.published {
        return Err(AppError::NotFound(format!("Tour {} not found", tour_id)));
    }
    Ok(())
}

/// GET /v1/tours/{id}/availability?from&to
///
/// Open slots only: past and sold-out departures are left out.
pub async fn get_availability(
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> HandlerResult<ListResponse<AvailabilitySlot>> {
    let Query(query) = query?;
    published_tour(&state, tour_id).await?;

    let today = today();
    let from = query.from.unwrap_or(today);
    let to = match query.to {
        Some(to) => to,
        None => from
            .checked_add_days(Days::new(AVAILABILITY_WINDOW_DAYS))
            .ok_or_else(|| AppError::BadRequest("Date out of range".to_string()))?,
    };
    if (to - from).num_days() >= availability::MAX_BULK_DAYS {
        return Err(AppError::BadRequest(format!(
            "Availability range is limited to {} days",
            availability::MAX_BULK_DAYS
        )));
    }
    let slots =
        availability::list_open_slots(state.repository.as_ref(), tour_id, from, to, today).await?;
    Ok(Json(slots.into()))
}

/// POST /v1/tours/{id}/quote
pub async fn quote_tour(
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> HandlerResult<PriceQuote> {
    let Json(request) = payload?;
    published_tour(&state, tour_id).await?;
    let quote = checkout::quote_tour(
        state.repository.as_ref(),
        tour_id,
        &request,
        &state.config.store.currency,
    )
    .await?;
    Ok(Json(quote))
}

/// GET /v1/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<Category>> {
    Ok(Json(state.repository.list_categories().await?.into()))
}

/// GET /v1/labels
pub async fn list_labels(State(state): State<AppState>) -> HandlerResult<ListResponse<SpecialLabel>> {
    Ok(Json(state.repository.list_labels().await?.into()))
}

// =============================================================================
// Checkout
// =============================================================================

/// POST /v1/checkout
///
/// Reserves seats and returns the payment client secret plus the URL the
/// gateway sends the customer back to.
pub async fn start_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutSession>), AppError> {
    let Json(request) = payload?;
    let session = checkout::start_checkout(
        state.repository.as_ref(),
        state.payments.as_ref(),
        &state.config.checkout_settings(),
        &request,
    )
    .await?;
    tracing::info!(booking_id = %session.booking_id, "checkout started");
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /v1/checkout/{token}/confirm
pub async fn confirm_checkout(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> HandlerResult<Booking> {
    let booking =
        checkout::confirm_payment(state.repository.as_ref(), state.payments.as_ref(), &token)
            .await?;
    Ok(Json(booking))
}

/// GET /v1/vouchers/{token}
pub async fn get_voucher(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> HandlerResult<Voucher> {
    let voucher = checkout::voucher(
        state.repository.as_ref(),
        &token,
        state.config.store.default_language,
    )
    .await?;
    Ok(Json(voucher))
}

// =============================================================================
// Content and analytics
// =============================================================================

/// GET /v1/pages/{slug}?lang
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<LangQuery>, QueryRejection>,
) -> HandlerResult<LocalizedPage> {
    let Query(query) = query?;
    let lang = lang_or_default(&state, query.lang);
    let page = pages::page_by_slug(
        state.repository.as_ref(),
        &slug,
        lang,
        state.config.store.default_language,
        true,
    )
    .await?;
    Ok(Json(page))
}

/// POST /v1/analytics/visits
pub async fn record_visit(
    State(state): State<AppState>,
    payload: Result<Json<VisitRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(request) = payload?;
    let visit: NewPageVisit = request.into();
    analytics::record_visit(state.repository.as_ref(), &visit).await?;
    Ok(StatusCode::NO_CONTENT)
}

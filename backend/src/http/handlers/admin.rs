//! Back-office endpoints. Every handler takes an [`AdminUser`], so requests
//! without a valid admin session never reach the body.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use chrono::Days;

use super::{today, HandlerResult};
use crate::http::auth::AdminUser;
use crate::http::dto::{
    AdminTourQuery, AdminTourView, BookingDetail, BulkSlotInput, DashboardQuery,
    DashboardSummary, DateRangeQuery, ListResponse, NotesUpdateRequest, StatusUpdateRequest,
    TranslateTextRequest, TranslateTextResponse, TranslationJob, UploadQuery, UploadedFile,
};
use crate::http::error::AppError;
use crate::http::state::AppState;
use crate::models::{
    AvailabilitySlot, BlockId, Booking, BookingFilter, BookingId, Category, CategoryId,
    CategoryInput, LabelId, LabelInput, Language, Package, PackageId, PackageInput, PageContent,
    PageId, PageInput, PricingConfig, SlotId, SlotInput, SpecialLabel, StaticPage, Tour,
    TourBlock, TourBlockInput, TourFilter, TourId, TourInput, TourPricing, Upsell, UpsellId,
    UpsellInput, UserProfile, UserRole,
};
use crate::services::{analytics, availability, bookings, catalog, pages, translation, uploads};

type Created<T> = Result<(StatusCode, Json<T>), AppError>;

fn created<T>(value: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(value)))
}

// =============================================================================
// Session
// =============================================================================

/// GET /v1/admin/me
pub async fn me(AdminUser(profile): AdminUser) -> HandlerResult<UserProfile> {
    Ok(Json(profile))
}

#[derive(Debug, serde::Deserialize)]
pub struct UserUpdate {
    pub email: String,
    pub role: UserRole,
}

/// PUT /v1/admin/users/{user_id}
pub async fn upsert_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> HandlerResult<UserProfile> {
    let Json(update) = payload?;
    if user_id == admin.user_id && update.role != UserRole::Admin {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }
    let profile = UserProfile {
        user_id,
        email: update.email,
        role: update.role,
    };
    Ok(Json(state.repository.upsert_user(&profile).await?))
}

// =============================================================================
// Tours
// =============================================================================

/// GET /v1/admin/tours?published&category&label
pub async fn list_tours(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<AdminTourQuery>, QueryRejection>,
) -> HandlerResult<ListResponse<Tour>> {
    let Query(query) = query?;
    let filter = TourFilter {
        published_only: query.published.unwrap_or(false),
        category_id: query.category,
        label_id: query.label,
    };
    Ok(Json(state.repository.list_tours(filter).await?.into()))
}

/// POST /v1/admin/tours
pub async fn create_tour(
    _admin: AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<TourInput>, JsonRejection>,
) -> Created<Tour> {
    let Json(input) = payload?;
    created(catalog::create_tour(state.repository.as_ref(), &input).await?)
}

/// GET /v1/admin/tours/{tour}
pub async fn get_tour(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
) -> HandlerResult<AdminTourView> {
    let repo = state.repository.as_ref();
    let tour = repo.get_tour(tour_id).await?;
    let mut blocks = repo.list_blocks(tour_id).await?;
    blocks.sort_by_key(|b| (b.position, b.id));
    Ok(Json(AdminTourView {
        tour,
        blocks,
        pricing: repo.get_pricing(tour_id).await?,
        upsells: repo.list_upsells(tour_id).await?,
        packages: repo.list_packages(tour_id).await?,
    }))
}

/// PUT /v1/admin/tours/{tour}
pub async fn update_tour(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<TourInput>, JsonRejection>,
) -> HandlerResult<Tour> {
    let Json(input) = payload?;
    Ok(Json(
        catalog::update_tour(state.repository.as_ref(), tour_id, &input).await?,
    ))
}

/// DELETE /v1/admin/tours/{tour}
pub async fn delete_tour(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_tour(tour_id).await?;
    tracing::info!(%tour_id, "tour deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/admin/tours/{tour}/blocks
///
/// Creates the block when the body has no `id`, replaces it otherwise.
pub async fn upsert_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<TourBlockInput>, JsonRejection>,
) -> HandlerResult<TourBlock> {
    let Json(input) = payload?;
    Ok(Json(
        catalog::upsert_block(state.repository.as_ref(), tour_id, &input).await?,
    ))
}

/// DELETE /v1/admin/blocks/{block}
pub async fn delete_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(block_id): Path<BlockId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_block(block_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/admin/tours/{tour}/pricing
pub async fn set_pricing(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<PricingConfig>, JsonRejection>,
) -> HandlerResult<TourPricing> {
    let Json(config) = payload?;
    Ok(Json(
        catalog::set_pricing(state.repository.as_ref(), tour_id, &config).await?,
    ))
}

/// POST /v1/admin/tours/{tour}/upsells
pub async fn create_upsell(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<UpsellInput>, JsonRejection>,
) -> Created<Upsell> {
    let Json(input) = payload?;
    created(catalog::create_upsell(state.repository.as_ref(), tour_id, &input).await?)
}

/// PUT /v1/admin/upsells/{upsell}
pub async fn update_upsell(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(upsell_id): Path<UpsellId>,
    payload: Result<Json<UpsellInput>, JsonRejection>,
) -> HandlerResult<Upsell> {
    let Json(input) = payload?;
    Ok(Json(
        catalog::update_upsell(state.repository.as_ref(), upsell_id, &input).await?,
    ))
}

/// DELETE /v1/admin/upsells/{upsell}
pub async fn delete_upsell(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(upsell_id): Path<UpsellId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_upsell(upsell_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/admin/tours/{tour}/packages
pub async fn create_package(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<PackageInput>, JsonRejection>,
) -> Created<Package> {
    let Json(input) = payload?;
    created(catalog::create_package(state.repository.as_ref(), tour_id, &input).await?)
}

/// DELETE /v1/admin/packages/{package}
pub async fn delete_package(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(package_id): Path<PackageId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_package(package_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Availability
// =============================================================================

/// GET /v1/admin/tours/{tour}/slots?from&to
///
/// Every slot in the range, including past and sold-out ones.
pub async fn list_slots(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> HandlerResult<ListResponse<AvailabilitySlot>> {
    let Query(query) = query?;
    let from = query.from.unwrap_or_else(today);
    let to = match query.to {
        Some(to) => to,
        None => from
            .checked_add_days(Days::new(365))
            .ok_or_else(|| AppError::BadRequest("Date out of range".to_string()))?,
    };
    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be before 'from'".to_string(),
        ));
    }
    let slots = state.repository.list_slots(tour_id, from, to).await?;
    Ok(Json(slots.into()))
}

/// POST /v1/admin/tours/{tour}/slots
pub async fn create_slot(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<SlotInput>, JsonRejection>,
) -> Created<AvailabilitySlot> {
    let Json(input) = payload?;
    created(availability::create_slot(state.repository.as_ref(), tour_id, &input).await?)
}

/// POST /v1/admin/tours/{tour}/slots/bulk
pub async fn create_slots_bulk(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<BulkSlotInput>, JsonRejection>,
) -> Created<ListResponse<AvailabilitySlot>> {
    let Json(input) = payload?;
    let slots =
        availability::create_slots_bulk(state.repository.as_ref(), tour_id, &input).await?;
    created(slots.into())
}

/// DELETE /v1/admin/slots/{slot}
///
/// Refused with 409 while bookings reference the slot.
pub async fn delete_slot(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(slot_id): Path<SlotId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_slot(slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Bookings
// =============================================================================

/// GET /v1/admin/bookings?status&tour_id&from&to
pub async fn list_bookings(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<BookingFilter>, QueryRejection>,
) -> HandlerResult<ListResponse<Booking>> {
    let Query(filter) = query?;
    Ok(Json(
        bookings::list_bookings(state.repository.as_ref(), &filter)
            .await?
            .into(),
    ))
}

/// GET /v1/admin/bookings/{booking}
pub async fn get_booking(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
) -> HandlerResult<BookingDetail> {
    Ok(Json(
        bookings::booking_detail(
            state.repository.as_ref(),
            booking_id,
            state.config.store.default_language,
        )
        .await?,
    ))
}

/// PUT /v1/admin/bookings/{booking}/status
pub async fn update_booking_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> HandlerResult<Booking> {
    let Json(request) = payload?;
    let booking =
        bookings::change_status(state.repository.as_ref(), booking_id, request.status).await?;
    tracing::info!(
        %booking_id,
        status = booking.status.as_str(),
        by = %admin.user_id,
        "booking status changed"
    );
    Ok(Json(booking))
}

/// PUT /v1/admin/bookings/{booking}/notes
pub async fn update_booking_notes(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(booking_id): Path<BookingId>,
    payload: Result<Json<NotesUpdateRequest>, JsonRejection>,
) -> HandlerResult<Booking> {
    let Json(request) = payload?;
    Ok(Json(
        bookings::update_notes(state.repository.as_ref(), booking_id, request.notes).await?,
    ))
}

// =============================================================================
// Pages
// =============================================================================

/// GET /v1/admin/pages
pub async fn list_pages(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<StaticPage>> {
    Ok(Json(state.repository.list_pages().await?.into()))
}

/// POST /v1/admin/pages
pub async fn create_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<PageInput>, JsonRejection>,
) -> Created<StaticPage> {
    let Json(input) = payload?;
    created(pages::create_page(state.repository.as_ref(), &input).await?)
}

/// GET /v1/admin/pages/{page}
pub async fn get_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<PageId>,
) -> HandlerResult<StaticPage> {
    Ok(Json(state.repository.get_page(page_id).await?))
}

/// PUT /v1/admin/pages/{page}
pub async fn update_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<PageId>,
    payload: Result<Json<PageInput>, JsonRejection>,
) -> HandlerResult<StaticPage> {
    let Json(input) = payload?;
    Ok(Json(
        pages::update_page(state.repository.as_ref(), page_id, &input).await?,
    ))
}

/// DELETE /v1/admin/pages/{page}
pub async fn delete_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<PageId>,
) -> Result<StatusCode, AppError> {
    pages::delete_page(state.repository.as_ref(), page_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/admin/pages/{page}/translations/{lang}
pub async fn upsert_page_translation(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((page_id, lang)): Path<(PageId, Language)>,
    payload: Result<Json<PageContent>, JsonRejection>,
) -> HandlerResult<StaticPage> {
    let Json(content) = payload?;
    Ok(Json(
        pages::upsert_translation(state.repository.as_ref(), page_id, lang, &content).await?,
    ))
}

// =============================================================================
// Categories and labels
// =============================================================================

/// POST /v1/admin/categories
pub async fn create_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> Created<Category> {
    let Json(input) = payload?;
    created(catalog::create_category(state.repository.as_ref(), &input).await?)
}

/// PUT /v1/admin/categories/{category}
pub async fn update_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> HandlerResult<Category> {
    let Json(input) = payload?;
    Ok(Json(
        catalog::update_category(state.repository.as_ref(), category_id, &input).await?,
    ))
}

/// DELETE /v1/admin/categories/{category}
pub async fn delete_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/admin/labels
pub async fn create_label(
    _admin: AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<LabelInput>, JsonRejection>,
) -> Created<SpecialLabel> {
    let Json(input) = payload?;
    created(catalog::create_label(state.repository.as_ref(), &input).await?)
}

/// PUT /v1/admin/labels/{label}
pub async fn update_label(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(label_id): Path<LabelId>,
    payload: Result<Json<LabelInput>, JsonRejection>,
) -> HandlerResult<SpecialLabel> {
    let Json(input) = payload?;
    Ok(Json(
        catalog::update_label(state.repository.as_ref(), label_id, &input).await?,
    ))
}

/// DELETE /v1/admin/labels/{label}
///
/// Also detaches the label from every tour.
pub async fn delete_label(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(label_id): Path<LabelId>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_label(label_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Uploads, dashboard, translation
// =============================================================================

/// POST /v1/admin/uploads?folder&filename
///
/// The request body is the raw file; its type comes from `Content-Type`.
pub async fn upload(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Created<UploadedFile> {
    let Query(query) = query?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Content-Type header is required".to_string()))?;
    let file = uploads::upload(
        state.storage.as_ref(),
        query.folder.as_deref().unwrap_or(""),
        &query.filename,
        content_type,
        body,
        state.config.uploads.max_bytes,
    )
    .await?;
    created(file)
}

/// GET /v1/admin/dashboard?from&to or ?days
pub async fn dashboard(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> HandlerResult<DashboardSummary> {
    let Query(query) = query?;
    let repo = state.repository.as_ref();
    let summary = match (query.from, query.to) {
        (Some(from), Some(to)) => analytics::dashboard(repo, from, to).await?,
        (Some(from), None) => analytics::dashboard(repo, from, today()).await?,
        (None, _) => analytics::recent_dashboard(repo, query.days.unwrap_or(30)).await?,
    };
    Ok(Json(summary))
}

/// POST /v1/admin/translate
pub async fn translate_text(
    _admin: AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<TranslateTextRequest>, JsonRejection>,
) -> HandlerResult<TranslateTextResponse> {
    let Json(request) = payload?;
    let translations =
        translation::translate_text(state.translator.as_ref(), &request.text, &request.job).await?;
    Ok(Json(TranslateTextResponse { translations }))
}

/// POST /v1/admin/translate/blocks/{block}
pub async fn translate_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(block_id): Path<BlockId>,
    payload: Result<Json<TranslationJob>, JsonRejection>,
) -> HandlerResult<TourBlock> {
    let Json(job) = payload?;
    Ok(Json(
        translation::translate_block(
            state.repository.as_ref(),
            state.translator.as_ref(),
            block_id,
            &job,
        )
        .await?,
    ))
}

/// POST /v1/admin/translate/pages/{page}
pub async fn translate_page(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(page_id): Path<PageId>,
    payload: Result<Json<TranslationJob>, JsonRejection>,
) -> HandlerResult<StaticPage> {
    let Json(job) = payload?;
    Ok(Json(
        translation::translate_page(
            state.repository.as_ref(),
            state.translator.as_ref(),
            page_id,
            &job,
        )
        .await?,
    ))
}

/// POST /v1/admin/translate/tours/{tour}
pub async fn translate_tour(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(tour_id): Path<TourId>,
    payload: Result<Json<TranslationJob>, JsonRejection>,
) -> HandlerResult<Tour> {
    let Json(job) = payload?;
    Ok(Json(
        translation::translate_tour(
            state.repository.as_ref(),
            state.translator.as_ref(),
            tour_id,
            &job,
        )
        .await?,
    ))
}

//! Data Transfer Objects for the HTTP API.
//!
//! Response bodies mostly reuse the service-layer types, which already derive
//! Serialize. This module holds query strings and the request bodies that
//! have no service counterpart.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use crate::services::analytics::DashboardSummary;
pub use crate::services::availability::BulkSlotInput;
pub use crate::services::bookings::BookingDetail;
pub use crate::services::catalog::{TourDetail, TourSummary};
pub use crate::services::pages::LocalizedPage;
pub use crate::services::translation::{TranslatedText, TranslationJob};
pub use crate::services::uploads::UploadedFile;

use crate::models::{
    BookingStatus, CategoryId, LabelId, Language, NewPageVisit, Package, Tour, TourBlock, TourId,
    TourPricing, Upsell,
};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// List wrapper used by collection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LangQuery {
    #[serde(default)]
    pub lang: Option<Language>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TourListQuery {
    #[serde(default)]
    pub lang: Option<Language>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub label: Option<LabelId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Trailing window used when no explicit range is given.
    #[serde(default)]
    pub days: Option<u32>,
}

/// Page-visit beacon sent by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRequest {
    pub path: String,
    #[serde(default)]
    pub tour_id: Option<TourId>,
    pub session_id: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl From<VisitRequest> for NewPageVisit {
    fn from(req: VisitRequest) -> Self {
        NewPageVisit {
            path: req.path,
            tour_id: req.tour_id,
            session_id: req.session_id,
            language: req.language,
            referrer: req.referrer.filter(|r| !r.is_empty()),
            visited_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesUpdateRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub folder: Option<String>,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateTextRequest {
    pub text: String,
    #[serde(flatten)]
    pub job: TranslationJob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateTextResponse {
    pub translations: Vec<TranslatedText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminTourQuery {
    /// Only published tours when set; all tours otherwise.
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub label: Option<LabelId>,
}

/// A tour with every editable part, untranslated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminTourView {
    pub tour: Tour,
    pub blocks: Vec<TourBlock>,
    pub pricing: Option<TourPricing>,
    pub upsells: Vec<Upsell>,
    pub packages: Vec<Package>,
}

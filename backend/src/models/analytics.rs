//! Page-visit analytics events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Language, TourId, VisitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisit {
    pub id: VisitId,
    pub path: String,
    pub tour_id: Option<TourId>,
    pub session_id: String,
    pub language: Language,
    pub referrer: Option<String>,
    pub visited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPageVisit {
    pub path: String,
    #[serde(default)]
    pub tour_id: Option<TourId>,
    pub session_id: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub referrer: Option<String>,
    pub visited_at: DateTime<Utc>,
}

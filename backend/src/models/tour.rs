//! Tours, their content blocks, upsells and packages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BlockId, CategoryId, LabelId, PackageId, TourId, Translations, UpsellId};

/// Localized title and teaser of a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourText {
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

/// A bookable tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: TourId,
    pub slug: String,
    pub translations: Translations<TourText>,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub label_ids: Vec<LabelId>,
    pub duration_minutes: i32,
    pub meeting_point: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or replacing a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourInput {
    pub slug: String,
    pub translations: Translations<TourText>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub label_ids: Vec<LabelId>,
    pub duration_minutes: i32,
    #[serde(default)]
    pub meeting_point: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

/// Filter for tour listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TourFilter {
    pub published_only: bool,
    pub category_id: Option<CategoryId>,
    pub label_id: Option<LabelId>,
}

impl TourFilter {
    pub fn matches(&self, tour: &Tour) -> bool {
        if self.published_only && !tour.published {
            return false;
        }
        if let Some(category) = self.category_id {
            if tour.category_id != Some(category) {
                return false;
            }
        }
        if let Some(label) = self.label_id {
            if !tour.label_ids.contains(&label) {
                return false;
            }
        }
        true
    }
}

/// Kind of content section on a tour page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Hero,
    Description,
    Highlights,
    Itinerary,
    Included,
    Excluded,
    Faq,
    Gallery,
    MeetingPoint,
    Custom,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Hero => "hero",
            BlockKind::Description => "description",
            BlockKind::Highlights => "highlights",
            BlockKind::Itinerary => "itinerary",
            BlockKind::Included => "included",
            BlockKind::Excluded => "excluded",
            BlockKind::Faq => "faq",
            BlockKind::Gallery => "gallery",
            BlockKind::MeetingPoint => "meeting_point",
            BlockKind::Custom => "custom",
        }
    }
}

impl std::str::FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hero" => Ok(BlockKind::Hero),
            "description" => Ok(BlockKind::Description),
            "highlights" => Ok(BlockKind::Highlights),
            "itinerary" => Ok(BlockKind::Itinerary),
            "included" => Ok(BlockKind::Included),
            "excluded" => Ok(BlockKind::Excluded),
            "faq" => Ok(BlockKind::Faq),
            "gallery" => Ok(BlockKind::Gallery),
            "meeting_point" => Ok(BlockKind::MeetingPoint),
            "custom" => Ok(BlockKind::Custom),
            other => Err(format!("Unknown block kind: {}", other)),
        }
    }
}

/// Text content of one block in one language.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
    /// List entries (itinerary stops, highlights, FAQ lines).
    #[serde(default)]
    pub items: Vec<String>,
}

/// A named content section of a tour page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourBlock {
    pub id: BlockId,
    pub tour_id: TourId,
    pub kind: BlockKind,
    pub position: i32,
    pub translations: Translations<BlockContent>,
}

/// Block upsert payload. A missing `id` creates a new block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourBlockInput {
    #[serde(default)]
    pub id: Option<BlockId>,
    pub kind: BlockKind,
    #[serde(default)]
    pub position: i32,
    pub translations: Translations<BlockContent>,
}

/// Optional paid add-on for a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upsell {
    pub id: UpsellId,
    pub tour_id: TourId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    /// Charged once per participant instead of once per booking.
    pub per_person: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsellInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub per_person: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Fixed-price bundle that replaces the base price of a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub tour_id: TourId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub max_participants: Option<u32>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

//! Static pages, categories and special labels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, LabelId, PageId, Translations};

/// Localized content of a static page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub meta_description: Option<String>,
}

/// An editable content page (About, FAQ, Terms, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPage {
    pub id: PageId,
    pub slug: String,
    pub published: bool,
    pub translations: Translations<PageContent>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    pub slug: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub translations: Translations<PageContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub position: i32,
}

/// Badge shown on tour cards ("Bestseller", "New").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialLabel {
    pub id: LabelId,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInput {
    pub name: String,
    #[serde(default = "default_label_color")]
    pub color: String,
}

fn default_label_color() -> String {
    "#1f2937".to_string()
}

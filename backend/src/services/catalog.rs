//! Tour catalog: localized storefront views and back-office editing.

use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::db::repository::{ContentRepository, TourRepository};
use crate::models::{
    localize, BlockContent, BlockId, BlockKind, Category, CategoryId, CategoryInput, LabelId,
    LabelInput, Language, Package, PackageInput, PricingConfig, SpecialLabel, Tour, TourBlock,
    TourBlockInput, TourFilter, TourId, TourInput, TourPricing, Upsell, UpsellId, UpsellInput,
};

/// Storefront listing card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSummary {
    pub id: TourId,
    pub slug: String,
    /// Language the text is served in, after fallback.
    pub language: Language,
    pub title: String,
    pub summary: String,
    pub duration_minutes: i32,
    pub cover_image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub labels: Vec<SpecialLabel>,
    pub from_price: Option<i64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub position: i32,
    pub language: Language,
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSummary {
    pub config: PricingConfig,
    pub from_price: Option<i64>,
    pub currency: String,
}

/// Everything the tour page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourDetail {
    pub id: TourId,
    pub slug: String,
    pub language: Language,
    pub title: String,
    pub summary: String,
    pub duration_minutes: i32,
    pub meeting_point: Option<String>,
    pub cover_image_url: Option<String>,
    pub gallery: Vec<String>,
    pub blocks: Vec<LocalizedBlock>,
    pub pricing: Option<PricingSummary>,
    pub upsells: Vec<Upsell>,
    pub packages: Vec<Package>,
    pub category: Option<Category>,
    pub labels: Vec<SpecialLabel>,
    pub available_languages: Vec<Language>,
}

/// Language settings shared by the localized views.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub default_language: Language,
    pub currency: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_language: Language::En,
            currency: "EUR".to_string(),
        }
    }
}

fn tour_text(tour: &Tour, lang: Language, fallback: Language) -> (Language, String, String) {
    match localize(&tour.translations, lang, fallback) {
        Some((served, text)) => (served, text.title.clone(), text.summary.clone()),
        None => (fallback, tour.slug.clone(), String::new()),
    }
}

fn labels_for(tour: &Tour, labels: &[SpecialLabel]) -> Vec<SpecialLabel> {
    tour.label_ids
        .iter()
        .filter_map(|id| labels.iter().find(|l| l.id == *id).cloned())
        .collect()
}

pub async fn list_tours<R>(
    repo: &R,
    filter: TourFilter,
    lang: Language,
    settings: &CatalogSettings,
) -> ServiceResult<Vec<TourSummary>>
where
    R: TourRepository + ContentRepository + ?Sized,
{
    let tours = repo.list_tours(filter).await?;
    let labels = repo.list_labels().await?;

    let mut summaries = Vec::with_capacity(tours.len());
    for tour in tours {
        let from_price = repo
            .get_pricing(tour.id)
            .await?
            .and_then(|p| p.config.starting_price());
        let (language, title, summary) = tour_text(&tour, lang, settings.default_language);
        summaries.push(TourSummary {
            labels: labels_for(&tour, &labels),
            id: tour.id,
            slug: tour.slug,
            language,
            title,
            summary,
            duration_minutes: tour.duration_minutes,
            cover_image_url: tour.cover_image_url,
            category_id: tour.category_id,
            from_price,
            currency: settings.currency.clone(),
        });
    }
    Ok(summaries)
}

/// Tour page by slug. Unpublished tours are hidden when `published_only`.
pub async fn tour_detail<R>(
    repo: &R,
    slug: &str,
    lang: Language,
    published_only: bool,
    settings: &CatalogSettings,
) -> ServiceResult<TourDetail>
where
    R: TourRepository + ContentRepository + ?Sized,
{
    let tour = repo.get_tour_by_slug(slug).await?;
    if published_only && !tour.published {
        return Err(ServiceError::not_found(format!("Tour '{}' not found", slug)));
    }
    let fallback = settings.default_language;

    let mut blocks = repo.list_blocks(tour.id).await?;
    blocks.sort_by_key(|b| (b.position, b.id));
    let blocks = blocks
        .into_iter()
        .filter_map(|block| {
            let (language, content) = localize(&block.translations, lang, fallback)?;
            Some(LocalizedBlock {
                id: block.id,
                kind: block.kind,
                position: block.position,
                language,
                content: content.clone(),
            })
        })
        .collect();

    let pricing = repo.get_pricing(tour.id).await?.map(|p| PricingSummary {
        from_price: p.config.starting_price(),
        config: p.config,
        currency: settings.currency.clone(),
    });
    let upsells = repo
        .list_upsells(tour.id)
        .await?
        .into_iter()
        .filter(|u| u.active)
        .collect();
    let packages = repo
        .list_packages(tour.id)
        .await?
        .into_iter()
        .filter(|p| p.active)
        .collect();
    let category = match tour.category_id {
        Some(id) => repo
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id),
        None => None,
    };
    let labels = labels_for(&tour, &repo.list_labels().await?);
    let (language, title, summary) = tour_text(&tour, lang, fallback);

    Ok(TourDetail {
        available_languages: tour.translations.keys().copied().collect(),
        id: tour.id,
        slug: tour.slug,
        language,
        title,
        summary,
        duration_minutes: tour.duration_minutes,
        meeting_point: tour.meeting_point,
        cover_image_url: tour.cover_image_url,
        gallery: tour.gallery,
        blocks,
        pricing,
        upsells,
        packages,
        category,
        labels,
    })
}

// =============================================================================
// Back office
// =============================================================================

/// Slugs are lowercase ASCII letters, digits and dashes.
pub fn validate_slug(slug: &str) -> ServiceResult<()> {
    let valid = !slug.is_empty()
        && slug.len() <= 120
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(ServiceError::validation(format!(
            "Invalid slug '{}': use lowercase letters, digits and dashes",
            slug
        )));
    }
    Ok(())
}

async fn validate_tour_input<R>(repo: &R, input: &TourInput) -> ServiceResult<()>
where
    R: ContentRepository + ?Sized,
{
    validate_slug(&input.slug)?;
    if input.translations.is_empty() {
        return Err(ServiceError::validation(
            "A tour needs at least one translation",
        ));
    }
    if let Some((lang, _)) = input
        .translations
        .iter()
        .find(|(_, text)| text.title.trim().is_empty())
    {
        return Err(ServiceError::validation(format!(
            "Tour title is empty for language '{}'",
            lang.code()
        )));
    }
    if input.duration_minutes <= 0 {
        return Err(ServiceError::validation("Duration must be positive"));
    }
    if let Some(category_id) = input.category_id {
        let exists = repo
            .list_categories()
            .await?
            .iter()
            .any(|c| c.id == category_id);
        if !exists {
            return Err(ServiceError::validation(format!(
                "Unknown category {}",
                category_id
            )));
        }
    }
    if !input.label_ids.is_empty() {
        let labels = repo.list_labels().await?;
        if let Some(missing) = input
            .label_ids
            .iter()
            .find(|id| !labels.iter().any(|l| l.id == **id))
        {
            return Err(ServiceError::validation(format!("Unknown label {}", missing)));
        }
    }
    Ok(())
}

pub async fn create_tour<R>(repo: &R, input: &TourInput) -> ServiceResult<Tour>
where
    R: TourRepository + ContentRepository + ?Sized,
{
    validate_tour_input(repo, input).await?;
    let tour = repo.create_tour(input).await?;
    log::info!("Created tour {} '{}'", tour.id, tour.slug);
    Ok(tour)
}

pub async fn update_tour<R>(repo: &R, tour_id: TourId, input: &TourInput) -> ServiceResult<Tour>
where
    R: TourRepository + ContentRepository + ?Sized,
{
    validate_tour_input(repo, input).await?;
    Ok(repo.update_tour(tour_id, input).await?)
}

pub async fn upsert_block<R>(
    repo: &R,
    tour_id: TourId,
    input: &TourBlockInput,
) -> ServiceResult<TourBlock>
where
    R: TourRepository + ?Sized,
{
    if input.translations.is_empty() {
        return Err(ServiceError::validation(
            "A block needs at least one translation",
        ));
    }
    repo.get_tour(tour_id).await?;
    Ok(repo.upsert_block(tour_id, input).await?)
}

pub async fn set_pricing<R>(
    repo: &R,
    tour_id: TourId,
    config: &PricingConfig,
) -> ServiceResult<TourPricing>
where
    R: TourRepository + ?Sized,
{
    config.validate().map_err(ServiceError::Validation)?;
    repo.get_tour(tour_id).await?;
    Ok(repo.set_pricing(tour_id, config).await?)
}

fn validate_offer(name: &str, price: i64) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::validation("Name is required"));
    }
    if price < 0 {
        return Err(ServiceError::validation("Price must not be negative"));
    }
    Ok(())
}

pub async fn create_upsell<R>(repo: &R, tour_id: TourId, input: &UpsellInput) -> ServiceResult<Upsell>
where
    R: TourRepository + ?Sized,
{
    validate_offer(&input.name, input.price)?;
    repo.get_tour(tour_id).await?;
    Ok(repo.create_upsell(tour_id, input).await?)
}

pub async fn update_upsell<R>(
    repo: &R,
    upsell_id: UpsellId,
    input: &UpsellInput,
) -> ServiceResult<Upsell>
where
    R: TourRepository + ?Sized,
{
    validate_offer(&input.name, input.price)?;
    Ok(repo.update_upsell(upsell_id, input).await?)
}

pub async fn create_package<R>(
    repo: &R,
    tour_id: TourId,
    input: &PackageInput,
) -> ServiceResult<Package>
where
    R: TourRepository + ?Sized,
{
    validate_offer(&input.name, input.price)?;
    if input.max_participants == Some(0) {
        return Err(ServiceError::validation(
            "max_participants must be at least 1",
        ));
    }
    repo.get_tour(tour_id).await?;
    Ok(repo.create_package(tour_id, input).await?)
}

pub async fn create_category<R>(repo: &R, input: &CategoryInput) -> ServiceResult<Category>
where
    R: ContentRepository + ?Sized,
{
    validate_slug(&input.slug)?;
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("Category name is required"));
    }
    Ok(repo.create_category(input).await?)
}

pub async fn update_category<R>(
    repo: &R,
    category_id: CategoryId,
    input: &CategoryInput,
) -> ServiceResult<Category>
where
    R: ContentRepository + ?Sized,
{
    validate_slug(&input.slug)?;
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("Category name is required"));
    }
    Ok(repo.update_category(category_id, input).await?)
}

/// `#rgb` or `#rrggbb`.
fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn validate_label(input: &LabelInput) -> ServiceResult<()> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("Label name is required"));
    }
    if !is_hex_color(&input.color) {
        return Err(ServiceError::validation(format!(
            "Invalid label color '{}'",
            input.color
        )));
    }
    Ok(())
}

pub async fn create_label<R>(repo: &R, input: &LabelInput) -> ServiceResult<SpecialLabel>
where
    R: ContentRepository + ?Sized,
{
    validate_label(input)?;
    Ok(repo.create_label(input).await?)
}

pub async fn update_label<R>(
    repo: &R,
    label_id: LabelId,
    input: &LabelInput,
) -> ServiceResult<SpecialLabel>
where
    R: ContentRepository + ?Sized,
{
    validate_label(input)?;
    Ok(repo.update_label(label_id, input).await?)
}

//! Static content pages.

use serde::{Deserialize, Serialize};

use super::catalog::validate_slug;
use super::error::{ServiceError, ServiceResult};
use crate::db::repository::ContentRepository;
use crate::models::{localize, Language, PageContent, PageId, PageInput, StaticPage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedPage {
    pub id: PageId,
    pub slug: String,
    pub language: Language,
    pub content: PageContent,
    pub available_languages: Vec<Language>,
}

pub async fn page_by_slug<R>(
    repo: &R,
    slug: &str,
    lang: Language,
    fallback: Language,
    published_only: bool,
) -> ServiceResult<LocalizedPage>
where
    R: ContentRepository + ?Sized,
{
    let page = repo.get_page_by_slug(slug).await?;
    if published_only && !page.published {
        return Err(ServiceError::not_found(format!("Page '{}' not found", slug)));
    }
    let (language, content) = localize(&page.translations, lang, fallback).ok_or_else(|| {
        ServiceError::not_found(format!("Page '{}' has no content yet", slug))
    })?;
    Ok(LocalizedPage {
        id: page.id,
        language,
        content: content.clone(),
        available_languages: page.translations.keys().copied().collect(),
        slug: page.slug,
    })
}

fn validate_content(lang: Language, content: &PageContent) -> ServiceResult<()> {
    if content.title.trim().is_empty() {
        return Err(ServiceError::validation(format!(
            "Page title is empty for language '{}'",
            lang.code()
        )));
    }
    Ok(())
}

fn validate_page(input: &PageInput) -> ServiceResult<()> {
    validate_slug(&input.slug)?;
    for (lang, content) in &input.translations {
        validate_content(*lang, content)?;
    }
    Ok(())
}

pub async fn create_page<R>(repo: &R, input: &PageInput) -> ServiceResult<StaticPage>
where
    R: ContentRepository + ?Sized,
{
    validate_page(input)?;
    let page = repo.create_page(input).await?;
    log::info!("Created page {} '{}'", page.id, page.slug);
    Ok(page)
}

pub async fn update_page<R>(repo: &R, page_id: PageId, input: &PageInput) -> ServiceResult<StaticPage>
where
    R: ContentRepository + ?Sized,
{
    validate_page(input)?;
    Ok(repo.update_page(page_id, input).await?)
}

pub async fn delete_page<R>(repo: &R, page_id: PageId) -> ServiceResult<()>
where
    R: ContentRepository + ?Sized,
{
    repo.delete_page(page_id).await?;
    log::info!("Deleted page {}", page_id);
    Ok(())
}

pub async fn upsert_translation<R>(
    repo: &R,
    page_id: PageId,
    lang: Language,
    content: &PageContent,
) -> ServiceResult<StaticPage>
where
    R: ContentRepository + ?Sized,
{
    validate_content(lang, content)?;
    Ok(repo.upsert_page_translation(page_id, lang, content).await?)
}

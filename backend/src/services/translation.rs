//! Machine translation of editorial content.
//!
//! Text is translated field by field and stored next to the source language.
//! Existing target translations are only replaced when `overwrite` is set, so
//! hand-edited copies survive a re-run.

use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::clients::Translator;
use crate::db::repository::{ContentRepository, TourRepository};
use crate::models::{
    BlockContent, BlockId, Language, PageContent, PageId, StaticPage, Tour, TourBlock,
    TourBlockInput, TourId, TourInput, TourText,
};

/// Source and targets of a translation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub source: Language,
    /// Every other supported language when empty.
    #[serde(default)]
    pub targets: Vec<Language>,
    #[serde(default)]
    pub overwrite: bool,
}

impl TranslationJob {
    fn targets(&self) -> Vec<Language> {
        let mut targets: Vec<Language> = if self.targets.is_empty() {
            Language::ALL.to_vec()
        } else {
            self.targets.clone()
        };
        targets.retain(|l| *l != self.source);
        targets.sort();
        targets.dedup();
        targets
    }

    fn wants<T>(&self, existing: Option<&T>) -> bool {
        self.overwrite || existing.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedText {
    pub language: Language,
    pub text: String,
}

async fn translate_opt(
    translator: &dyn Translator,
    text: Option<&str>,
    source: Language,
    target: Language,
) -> ServiceResult<Option<String>> {
    match text {
        Some(text) => Ok(Some(translate(translator, text, source, target).await?)),
        None => Ok(None),
    }
}

async fn translate(
    translator: &dyn Translator,
    text: &str,
    source: Language,
    target: Language,
) -> ServiceResult<String> {
    if text.trim().is_empty() {
        return Ok(text.to_string());
    }
    translator
        .translate(text, source, target)
        .await
        .map_err(ServiceError::Translation)
}

pub async fn translate_text(
    translator: &dyn Translator,
    text: &str,
    job: &TranslationJob,
) -> ServiceResult<Vec<TranslatedText>> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("Text to translate is empty"));
    }
    if text.chars().count() > 20_000 {
        return Err(ServiceError::validation(
            "Text is limited to 20000 characters",
        ));
    }
    let mut out = Vec::new();
    for target in job.targets() {
        out.push(TranslatedText {
            language: target,
            text: translate(translator, text, job.source, target).await?,
        });
    }
    Ok(out)
}

async fn translate_block_content(
    translator: &dyn Translator,
    content: &BlockContent,
    source: Language,
    target: Language,
) -> ServiceResult<BlockContent> {
    let mut items = Vec::with_capacity(content.items.len());
    for item in &content.items {
        items.push(translate(translator, item, source, target).await?);
    }
    Ok(BlockContent {
        title: translate_opt(translator, content.title.as_deref(), source, target).await?,
        body: translate(translator, &content.body, source, target).await?,
        items,
    })
}

pub async fn translate_block<R>(
    repo: &R,
    translator: &dyn Translator,
    block_id: BlockId,
    job: &TranslationJob,
) -> ServiceResult<TourBlock>
where
    R: TourRepository + ?Sized,
{
    let block = repo.get_block(block_id).await?;
    let source = block.translations.get(&job.source).ok_or_else(|| {
        ServiceError::validation(format!(
            "Block {} has no '{}' content",
            block_id,
            job.source.code()
        ))
    })?;

    let mut translations = block.translations.clone();
    let mut changed = 0;
    for target in job.targets() {
        if !job.wants(block.translations.get(&target)) {
            continue;
        }
        let content = translate_block_content(translator, source, job.source, target).await?;
        translations.insert(target, content);
        changed += 1;
    }
    if changed == 0 {
        return Ok(block);
    }

    let input = TourBlockInput {
        id: Some(block.id),
        kind: block.kind,
        position: block.position,
        translations,
    };
    let updated = repo.upsert_block(block.tour_id, &input).await?;
    log::info!("Translated block {} into {} languages", block_id, changed);
    Ok(updated)
}

pub async fn translate_page<R>(
    repo: &R,
    translator: &dyn Translator,
    page_id: PageId,
    job: &TranslationJob,
) -> ServiceResult<StaticPage>
where
    R: ContentRepository + ?Sized,
{
    let mut page = repo.get_page(page_id).await?;
    let source = page.translations.get(&job.source).cloned().ok_or_else(|| {
        ServiceError::validation(format!(
            "Page {} has no '{}' content",
            page_id,
            job.source.code()
        ))
    })?;

    for target in job.targets() {
        if !job.wants(page.translations.get(&target)) {
            continue;
        }
        let content = PageContent {
            title: translate(translator, &source.title, job.source, target).await?,
            body: translate(translator, &source.body, job.source, target).await?,
            meta_description: translate_opt(
                translator,
                source.meta_description.as_deref(),
                job.source,
                target,
            )
            .await?,
        };
        page = repo.upsert_page_translation(page_id, target, &content).await?;
    }
    Ok(page)
}

pub async fn translate_tour<R>(
    repo: &R,
    translator: &dyn Translator,
    tour_id: TourId,
    job: &TranslationJob,
) -> ServiceResult<Tour>
where
    R: TourRepository + ?Sized,
{
    let tour = repo.get_tour(tour_id).await?;
    let source = tour.translations.get(&job.source).ok_or_else(|| {
        ServiceError::validation(format!(
            "Tour {} has no '{}' text",
            tour_id,
            job.source.code()
        ))
    })?;

    let mut translations = tour.translations.clone();
    let mut changed = false;
    for target in job.targets() {
        if !job.wants(tour.translations.get(&target)) {
            continue;
        }
        let text = TourText {
            title: translate(translator, &source.title, job.source, target).await?,
            summary: translate(translator, &source.summary, job.source, target).await?,
        };
        translations.insert(target, text);
        changed = true;
    }
    if !changed {
        return Ok(tour);
    }

    let input = TourInput {
        slug: tour.slug.clone(),
        translations,
        category_id: tour.category_id,
        label_ids: tour.label_ids.clone(),
        duration_minutes: tour.duration_minutes,
        meeting_point: tour.meeting_point.clone(),
        cover_image_url: tour.cover_image_url.clone(),
        gallery: tour.gallery.clone(),
        published: tour.published,
    };
    Ok(repo.update_tour(tour_id, &input).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockTranslator;
    use crate::db::LocalRepository;
    use crate::models::{BlockKind, Translations};

    fn job(targets: Vec<Language>, overwrite: bool) -> TranslationJob {
        TranslationJob {
            source: Language::En,
            targets,
            overwrite,
        }
    }

    #[test]
    fn test_targets_default_to_all_but_source() {
        let all = job(vec![], false).targets();
        assert_eq!(all.len(), Language::ALL.len() - 1);
        assert!(!all.contains(&Language::En));

        let some = job(vec![Language::Fr, Language::En, Language::Fr], false).targets();
        assert_eq!(some, vec![Language::Fr]);
    }

    #[tokio::test]
    async fn test_translate_text() {
        let out = translate_text(&MockTranslator, "Hello", &job(vec![Language::De], false))
            .await
            .unwrap();
        assert_eq!(out[0].text, "[de] Hello");
        assert!(translate_text(&MockTranslator, "  ", &job(vec![], false))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_block_translation_respects_overwrite() {
        let repo = LocalRepository::new();
        let mut tour_translations = Translations::new();
        tour_translations.insert(
            Language::En,
            TourText {
                title: "Bike tour".to_string(),
                summary: String::new(),
            },
        );
        let tour = repo
            .create_tour(&TourInput {
                slug: "bike".to_string(),
                translations: tour_translations,
                category_id: None,
                label_ids: vec![],
                duration_minutes: 120,
                meeting_point: None,
                cover_image_url: None,
                gallery: vec![],
                published: true,
            })
            .await
            .unwrap();

        let mut translations = Translations::new();
        translations.insert(
            Language::En,
            BlockContent {
                title: Some("Route".to_string()),
                body: "Along the river".to_string(),
                items: vec!["Bridge".to_string()],
            },
        );
        translations.insert(
            Language::Es,
            BlockContent {
                title: Some("Ruta (editada)".to_string()),
                ..Default::default()
            },
        );
        let block = repo
            .upsert_block(
                tour.id,
                &TourBlockInput {
                    id: None,
                    kind: BlockKind::Itinerary,
                    position: 0,
                    translations,
                },
            )
            .await
            .unwrap();

        let targets = vec![Language::Es, Language::Fr];
        let updated = translate_block(&repo, &MockTranslator, block.id, &job(targets.clone(), false))
            .await
            .unwrap();
        assert_eq!(
            updated.translations[&Language::Es].title.as_deref(),
            Some("Ruta (editada)")
        );
        assert_eq!(updated.translations[&Language::Fr].items, vec!["[fr] Bridge"]);

        let updated = translate_block(&repo, &MockTranslator, block.id, &job(targets, true))
            .await
            .unwrap();
        assert_eq!(
            updated.translations[&Language::Es].body,
            "[es] Along the river"
        );

        let tour = translate_tour(&repo, &MockTranslator, tour.id, &job(vec![Language::It], false))
            .await
            .unwrap();
        assert_eq!(tour.translations[&Language::It].title, "[it] Bike tour");
        assert_eq!(tour.translations[&Language::It].summary, "");
    }
}

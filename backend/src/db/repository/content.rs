//! Static page, category and label repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    Category, CategoryId, CategoryInput, LabelId, LabelInput, Language, PageContent, PageId,
    PageInput, SpecialLabel, StaticPage,
};

/// Repository trait for editable site content.
///
/// Slugs of pages and categories are unique; writes that would duplicate one
/// fail with `RepositoryError::ConflictError`.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    // ==================== Static Pages ====================

    async fn list_pages(&self) -> RepositoryResult<Vec<StaticPage>>;

    async fn get_page(&self, page_id: PageId) -> RepositoryResult<StaticPage>;

    async fn get_page_by_slug(&self, slug: &str) -> RepositoryResult<StaticPage>;

    async fn create_page(&self, input: &PageInput) -> RepositoryResult<StaticPage>;

    async fn update_page(&self, page_id: PageId, input: &PageInput)
        -> RepositoryResult<StaticPage>;

    async fn delete_page(&self, page_id: PageId) -> RepositoryResult<()>;

    /// Insert or replace one language of a page.
    async fn upsert_page_translation(
        &self,
        page_id: PageId,
        language: Language,
        content: &PageContent,
    ) -> RepositoryResult<StaticPage>;

    // ==================== Categories ====================

    /// List categories ordered by position, then id.
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>>;

    async fn create_category(&self, input: &CategoryInput) -> RepositoryResult<Category>;

    async fn update_category(
        &self,
        category_id: CategoryId,
        input: &CategoryInput,
    ) -> RepositoryResult<Category>;

    /// Delete a category; tours in it become uncategorized.
    async fn delete_category(&self, category_id: CategoryId) -> RepositoryResult<()>;

    // ==================== Special Labels ====================

    async fn list_labels(&self) -> RepositoryResult<Vec<SpecialLabel>>;

    async fn create_label(&self, input: &LabelInput) -> RepositoryResult<SpecialLabel>;

    async fn update_label(&self, label_id: LabelId, input: &LabelInput)
        -> RepositoryResult<SpecialLabel>;

    /// Delete a label and detach it from every tour.
    async fn delete_label(&self, label_id: LabelId) -> RepositoryResult<()>;
}

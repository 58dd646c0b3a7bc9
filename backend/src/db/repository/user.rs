//! User profile repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::UserProfile;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch the profile of an auth subject, if it has one.
    async fn get_user(&self, user_id: &str) -> RepositoryResult<Option<UserProfile>>;

    /// Insert or replace a profile.
    async fn upsert_user(&self, profile: &UserProfile) -> RepositoryResult<UserProfile>;
}

//! Moderation operations exposed on the operations listener.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CreateGroupParams, GroupsRepo, PostsWriteRepo, RepoError, UsersRepo};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugError, derive_slug, validate_group_slug};

const MAX_GROUP_TITLE_LEN: usize = 200;
const MAX_GROUP_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid group: {0}")]
    InvalidGroup(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct AdminService {
    groups: Arc<dyn GroupsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    users: Arc<dyn UsersRepo>,
}

impl AdminService {
    pub fn new(
        groups: Arc<dyn GroupsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            groups,
            posts_write,
            users,
        }
    }

    pub async fn create_group(&self, input: NewGroup) -> Result<GroupRecord, AdminError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AdminError::InvalidGroup("title is required".to_string()));
        }
        if title.chars().count() > MAX_GROUP_TITLE_LEN {
            return Err(AdminError::InvalidGroup(format!(
                "title exceeds {MAX_GROUP_TITLE_LEN} characters"
            )));
        }

        let slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => derive_slug(&title)?,
        };
        validate_group_slug(&slug)?;

        let description = input
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if description
            .as_ref()
            .is_some_and(|value| value.chars().count() > MAX_GROUP_DESCRIPTION_LEN)
        {
            return Err(AdminError::InvalidGroup(format!(
                "description exceeds {MAX_GROUP_DESCRIPTION_LEN} characters"
            )));
        }

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug,
                description,
            })
            .await?;
        info!(
            target = "postboard::application::admin",
            group_id = %group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }

    pub async fn delete_group(&self, slug: &str) -> Result<(), AdminError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(RepoError::NotFound)?;
        self.groups.delete_group(group.id).await?;
        info!(target = "postboard::application::admin", %slug, "group deleted");
        Ok(())
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), AdminError> {
        self.posts_write.delete_post(id).await?;
        info!(target = "postboard::application::admin", post_id = %id, "post deleted");
        Ok(())
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), AdminError> {
        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(RepoError::NotFound)?;
        self.users.delete_user(user.id).await?;
        info!(target = "postboard::application::admin", %username, "user deleted");
        Ok(())
    }
}

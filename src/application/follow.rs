//! The directed "user follows author" relation.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("author `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Create the edge unless it is a self-follow or already present.
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<(), FollowError> {
        if user_id == author_id {
            return Ok(());
        }
        let created = self.follows.insert_follow(user_id, author_id).await?;
        debug!(
            target = "postboard::application::follow",
            %user_id,
            %author_id,
            created,
            "follow requested"
        );
        Ok(())
    }

    pub async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<(), FollowError> {
        let removed = self.follows.delete_follow(user_id, author_id).await?;
        debug!(
            target = "postboard::application::follow",
            %user_id,
            %author_id,
            removed,
            "unfollow requested"
        );
        Ok(())
    }

    pub async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, FollowError> {
        Ok(self.follows.follow_exists(user_id, author_id).await?)
    }

    pub async fn follow_username(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, FollowError> {
        let author = self.resolve_author(username).await?;
        self.follow(user_id, author.id).await?;
        Ok(author)
    }

    pub async fn unfollow_username(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, FollowError> {
        let author = self.resolve_author(username).await?;
        self.unfollow(user_id, author.id).await?;
        Ok(author)
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}

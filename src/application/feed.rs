//! Assembles the paginated post listings: home, group, profile and the
//! followed-authors feed.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{PAGE_SIZE, PageParam, PageWindow, Paginator};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, PostEntry, UserRecord};
use crate::domain::viewer::Viewer;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("group `{0}` does not exist")]
    UnknownGroup(String),
    #[error("author `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type PostPage = PageWindow<PostEntry>;

#[derive(Debug, Clone)]
pub struct GroupListing {
    pub group: GroupRecord,
    pub page: PostPage,
}

#[derive(Debug, Clone)]
pub struct ProfileListing {
    pub author: UserRecord,
    pub post_count: u64,
    /// `None` when the viewer is anonymous or is the author.
    pub following: Option<bool>,
    pub page: PostPage,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
        }
    }

    pub async fn home(&self, page: PageParam) -> Result<PostPage, FeedError> {
        self.page_of(&PostFilter::All, page).await
    }

    pub async fn group(&self, slug: &str, page: PageParam) -> Result<GroupListing, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self.page_of(&PostFilter::Group(group.id), page).await?;
        Ok(GroupListing { group, page })
    }

    pub async fn profile(
        &self,
        viewer: &Viewer,
        username: &str,
        page: PageParam,
    ) -> Result<ProfileListing, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let following = match viewer.id() {
            Some(viewer_id) if viewer_id != author.id => {
                Some(self.follows.follow_exists(viewer_id, author.id).await?)
            }
            _ => None,
        };

        let page = self.page_of(&PostFilter::Author(author.id), page).await?;
        Ok(ProfileListing {
            post_count: page.total,
            author,
            following,
            page,
        })
    }

    /// Posts by every author `user_id` follows, newest first.
    pub async fn followed(&self, user_id: Uuid, page: PageParam) -> Result<PostPage, FeedError> {
        let authors = self.follows.list_followed_authors(user_id).await?;
        self.page_of(&PostFilter::Authors(authors), page).await
    }

    async fn page_of(&self, filter: &PostFilter, page: PageParam) -> Result<PostPage, FeedError> {
        if matches!(filter, PostFilter::Authors(authors) if authors.is_empty()) {
            return Ok(PageWindow::new(Vec::new(), 1, 1, 0));
        }

        let total = self.posts.count_posts(filter).await?;
        let paginator = Paginator::new(total, PAGE_SIZE);
        let bounds = paginator.resolve(page);
        let items = self
            .posts
            .list_posts(filter, bounds.offset, bounds.limit)
            .await?;

        Ok(PageWindow::new(
            items,
            bounds.number,
            paginator.num_pages(),
            total,
        ))
    }
}

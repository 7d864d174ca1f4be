//! Post authoring, editing, detail and comments.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostFilter, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentEntry, CommentRecord, GroupRecord, PostEntry, PostRecord};

/// Where uploaded post images are kept.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist the image and return its storage-relative path.
    async fn save_image(&self, original_name: &str, data: Bytes) -> Result<String, MediaError>;

    /// Remove a stored image. Missing files are not an error.
    async fn remove_image(&self, stored_path: &str) -> Result<(), MediaError>;
}

#[derive(Debug, Error)]
#[error("media storage failed: {message}")]
pub struct MediaError {
    pub message: String,
}

impl MediaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw post form input, as submitted.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    /// Group id as sent by the `<select>`; empty means no group.
    pub group: String,
    pub image: Option<ImageUpload>,
    pub clear_image: bool,
}

/// Per-field validation messages for the post form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormErrors {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<String>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post `{0}` does not exist")]
    NotFound(Uuid),
    #[error("only the author may edit post `{post_id}`")]
    NotAuthor { post_id: Uuid },
    #[error("post form is invalid")]
    Invalid(PostFormErrors),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub entry: PostEntry,
    pub author_post_count: u64,
    pub comments: Vec<CommentEntry>,
}

struct ValidatedPost {
    text: String,
    group_id: Option<Uuid>,
    image: Option<ImageUpload>,
}

const TEXT_REQUIRED: &str = "This field is required.";
const GROUP_INVALID: &str = "Select a valid choice. That choice is not one of the available choices.";
const IMAGE_EMPTY: &str = "The submitted file is empty.";
const IMAGE_INVALID: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    media: Arc<dyn MediaStore>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
            comments,
            media,
        }
    }

    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn detail(&self, id: Uuid) -> Result<PostDetail, PostError> {
        let entry = self
            .posts
            .find_post_entry(id)
            .await?
            .ok_or(PostError::NotFound(id))?;
        let author_post_count = self
            .posts
            .count_posts(&PostFilter::Author(entry.post.author_id))
            .await?;
        let comments = self.comments.list_comments_for_post(id).await?;
        Ok(PostDetail {
            entry,
            author_post_count,
            comments,
        })
    }

    /// Load a post for editing, refusing anyone but its author.
    pub async fn editable(&self, editor_id: Uuid, id: Uuid) -> Result<PostRecord, PostError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(PostError::NotFound(id))?;
        if post.author_id != editor_id {
            return Err(PostError::NotAuthor { post_id: id });
        }
        Ok(post)
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        submission: PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let validated = self.validate(submission).await?;

        let image_path = match validated.image {
            Some(upload) => Some(self.media.save_image(&upload.filename, upload.data).await?),
            None => None,
        };

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                author_id,
                group_id: validated.group_id,
                text: validated.text,
                image_path,
            })
            .await?;

        info!(
            target = "postboard::application::posts",
            post_id = %post.id,
            author_id = %author_id,
            "post created"
        );
        Ok(post)
    }

    pub async fn update(
        &self,
        editor_id: Uuid,
        id: Uuid,
        submission: PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let existing = self.editable(editor_id, id).await?;
        let clear_image = submission.clear_image;
        let validated = self.validate(submission).await?;

        let image_path = match validated.image {
            Some(upload) => Some(self.media.save_image(&upload.filename, upload.data).await?),
            None if clear_image => None,
            None => existing.image_path.clone(),
        };

        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id,
                group_id: validated.group_id,
                text: validated.text,
                image_path: image_path.clone(),
            })
            .await?;

        if let Some(previous) = existing.image_path.as_deref()
            && image_path.as_deref() != Some(previous)
            && let Err(err) = self.media.remove_image(previous).await
        {
            warn!(
                target = "postboard::application::posts",
                post_id = %id,
                path = previous,
                error = %err,
                "failed to remove replaced image"
            );
        }

        Ok(post)
    }

    /// Add a comment to an existing post. Blank text is dropped and yields `None`.
    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> Result<Option<CommentRecord>, PostError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(PostError::NotFound(post_id));
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: text.to_string(),
            })
            .await?;
        Ok(Some(comment))
    }

    async fn validate(&self, submission: PostSubmission) -> Result<ValidatedPost, PostError> {
        let mut errors = PostFormErrors::default();

        let text = submission.text.trim().to_string();
        if text.is_empty() {
            errors.text = Some(TEXT_REQUIRED.to_string());
        }

        let group_id = match submission.group.trim() {
            "" => None,
            raw => match Uuid::parse_str(raw) {
                Ok(id) if self.groups.find_group_by_id(id).await?.is_some() => Some(id),
                _ => {
                    errors.group = Some(GROUP_INVALID.to_string());
                    None
                }
            },
        };

        let image = match submission.image {
            Some(upload) if upload.filename.is_empty() && upload.data.is_empty() => None,
            Some(upload) => match check_image(&upload.data) {
                Ok(()) => Some(upload),
                Err(message) => {
                    errors.image = Some(message.to_string());
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(PostError::Invalid(errors));
        }

        Ok(ValidatedPost {
            text,
            group_id,
            image,
        })
    }
}

fn check_image(data: &[u8]) -> Result<(), &'static str> {
    if data.is_empty() {
        return Err(IMAGE_EMPTY);
    }
    match imagesize::blob_size(data) {
        Ok(size) if size.width > 0 && size.height > 0 => Ok(()),
        _ => Err(IMAGE_INVALID),
    }
}

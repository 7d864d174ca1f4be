//! In-process repository backend.
//!
//! Used when no database URL is configured and throughout the test suite. It
//! enforces the same uniqueness, foreign-key and cascade rules as the SQL
//! schema; cascades are driven by [`crate::domain::relations::RELATIONS`].

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateSessionParams,
    CreateUserParams, FollowsRepo, GroupsRepo, PostFilter, PostsRepo, PostsWriteRepo, RepoError,
    SessionsRepo, StoreHealth, UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{
    CommentEntry, CommentRecord, FollowRecord, GroupRecord, GroupRef, PostEntry, PostRecord,
    SessionRecord, UserRecord,
};
use crate::domain::relations::{EntityKind, ForeignKey, OnDelete, referencing};

/// Insertion order, used to break timestamp ties deterministically.
type Seq = u64;

#[derive(Debug, Default)]
struct State {
    seq: Seq,
    users: HashMap<Uuid, (Seq, UserRecord)>,
    groups: HashMap<Uuid, (Seq, GroupRecord)>,
    posts: HashMap<Uuid, (Seq, PostRecord)>,
    comments: HashMap<Uuid, (Seq, CommentRecord)>,
    follows: HashMap<Uuid, (Seq, FollowRecord)>,
    sessions: HashMap<Uuid, (Seq, SessionRecord)>,
}

impl State {
    fn next_seq(&mut self) -> Seq {
        self.seq += 1;
        self.seq
    }

    fn post_matches(&self, post: &PostRecord, filter: &PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(*group_id),
            PostFilter::Author(author_id) => post.author_id == *author_id,
            PostFilter::Authors(authors) => authors.contains(&post.author_id),
        }
    }

    fn entry_for(&self, post: &PostRecord) -> PostEntry {
        let author_username = self
            .users
            .get(&post.author_id)
            .map(|(_, user)| user.username.clone())
            .unwrap_or_default();
        let group = post
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(|(_, group)| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            });
        PostEntry {
            post: post.clone(),
            author_username,
            group,
        }
    }

    fn ensure_group(&self, group_id: Option<Uuid>) -> Result<(), RepoError> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => Err(RepoError::InvalidInput {
                message: format!("group `{id}` does not exist"),
            }),
            _ => Ok(()),
        }
    }

    fn ensure_user(&self, user_id: Uuid) -> Result<(), RepoError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(RepoError::InvalidInput {
                message: format!("user `{user_id}` does not exist"),
            })
        }
    }

    fn remove_row(&mut self, kind: EntityKind, id: Uuid) -> bool {
        match kind {
            EntityKind::User => self.users.remove(&id).is_some(),
            EntityKind::Group => self.groups.remove(&id).is_some(),
            EntityKind::Post => self.posts.remove(&id).is_some(),
            EntityKind::Comment => self.comments.remove(&id).is_some(),
            EntityKind::Follow => self.follows.remove(&id).is_some(),
            EntityKind::Session => self.sessions.remove(&id).is_some(),
        }
    }

    fn children_of(&self, key: ForeignKey, parent: Uuid) -> Vec<Uuid> {
        match key {
            ForeignKey::PostGroup => self
                .posts
                .values()
                .filter(|(_, post)| post.group_id == Some(parent))
                .map(|(_, post)| post.id)
                .collect(),
            ForeignKey::PostAuthor => self
                .posts
                .values()
                .filter(|(_, post)| post.author_id == parent)
                .map(|(_, post)| post.id)
                .collect(),
            ForeignKey::CommentPost => self
                .comments
                .values()
                .filter(|(_, comment)| comment.post_id == parent)
                .map(|(_, comment)| comment.id)
                .collect(),
            ForeignKey::CommentAuthor => self
                .comments
                .values()
                .filter(|(_, comment)| comment.author_id == parent)
                .map(|(_, comment)| comment.id)
                .collect(),
            ForeignKey::FollowUser => self
                .follows
                .values()
                .filter(|(_, follow)| follow.user_id == parent)
                .map(|(_, follow)| follow.id)
                .collect(),
            ForeignKey::FollowAuthor => self
                .follows
                .values()
                .filter(|(_, follow)| follow.author_id == parent)
                .map(|(_, follow)| follow.id)
                .collect(),
            ForeignKey::SessionUser => self
                .sessions
                .values()
                .filter(|(_, session)| session.user_id == parent)
                .map(|(_, session)| session.id)
                .collect(),
        }
    }

    fn clear_reference(&mut self, key: ForeignKey, child: Uuid) {
        // Post.group is the only nullable foreign key.
        if key == ForeignKey::PostGroup
            && let Some((_, post)) = self.posts.get_mut(&child)
        {
            post.group_id = None;
        }
    }

    /// Delete a row and apply the declared relation rules transitively.
    fn delete_cascading(&mut self, kind: EntityKind, id: Uuid) -> bool {
        let mut pending = vec![(kind, id)];
        let mut found = false;

        while let Some((kind, id)) = pending.pop() {
            if !self.remove_row(kind, id) {
                continue;
            }
            found = true;

            for relation in referencing(kind) {
                let children = self.children_of(relation.key, id);
                match relation.on_delete {
                    OnDelete::Cascade => pending.extend(
                        children
                            .into_iter()
                            .map(|child| (relation.key.child(), child)),
                    ),
                    OnDelete::SetNull => {
                        for child in children {
                            self.clear_reference(relation.key, child);
                        }
                    }
                }
            }
        }

        found
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    state: RwLock<State>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|(_, user)| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        let seq = state.next_seq();
        state.users.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|(_, user)| user.clone()))
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|(_, user)| user.username == username)
            .map(|(_, user)| user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.delete_cascading(EntityKind::User, id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .groups
            .values()
            .any(|(_, group)| group.slug == params.slug)
        {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }

        let record = GroupRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        let seq = state.next_seq();
        state.groups.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        let mut groups: Vec<_> = state
            .groups
            .values()
            .map(|(_, group)| group.clone())
            .collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(groups)
    }

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.groups.get(&id).map(|(_, group)| group.clone()))
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .groups
            .values()
            .find(|(_, group)| group.slug == slug)
            .map(|(_, group)| group.clone()))
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.delete_cascading(EntityKind::Group, id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let state = self.state.read().await;
        let mut matching: Vec<_> = state
            .posts
            .values()
            .filter(|(_, post)| state.post_matches(post, filter))
            .collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, post)| state.entry_for(post))
            .collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        let count = state
            .posts
            .values()
            .filter(|(_, post)| state.post_matches(post, filter))
            .count();
        Ok(count as u64)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).map(|(_, post)| post.clone()))
    }

    async fn find_post_entry(&self, id: Uuid) -> Result<Option<PostEntry>, RepoError> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).map(|(_, post)| state.entry_for(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        state.ensure_user(params.author_id)?;
        state.ensure_group(params.group_id)?;

        let record = PostRecord {
            id: Uuid::new_v4(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image_path: params.image_path,
            created_at: OffsetDateTime::now_utc(),
        };
        let seq = state.next_seq();
        state.posts.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        state.ensure_group(params.group_id)?;

        let (_, post) = state.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.group_id = params.group_id;
        post.text = params.text;
        post.image_path = params.image_path;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.delete_cascading(EntityKind::Post, id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.write().await;
        state.ensure_user(params.author_id)?;
        if !state.posts.contains_key(&params.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post `{}` does not exist", params.post_id),
            });
        }

        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        let seq = state.next_seq();
        state.comments.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn list_comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentEntry>, RepoError> {
        let state = self.state.read().await;
        let mut comments: Vec<_> = state
            .comments
            .values()
            .filter(|(_, comment)| comment.post_id == post_id)
            .collect();
        comments.sort_by(|(seq_a, a), (seq_b, b)| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| seq_a.cmp(seq_b))
        });

        Ok(comments
            .into_iter()
            .map(|(_, comment)| CommentEntry {
                author_username: state
                    .users
                    .get(&comment.author_id)
                    .map(|(_, user)| user.username.clone())
                    .unwrap_or_default(),
                comment: comment.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "a user cannot follow themself".to_string(),
            });
        }

        // Check and insert under one write lock so concurrent calls cannot both insert.
        let mut state = self.state.write().await;
        state.ensure_user(user_id)?;
        state.ensure_user(author_id)?;
        if state
            .follows
            .values()
            .any(|(_, follow)| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Ok(false);
        }

        let record = FollowRecord {
            id: Uuid::new_v4(),
            user_id,
            author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        let seq = state.next_seq();
        state.follows.insert(record.id, (seq, record));
        Ok(true)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|_, (_, follow)| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(state.follows.len() != before)
    }

    async fn follow_exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .any(|(_, follow)| follow.user_id == user_id && follow.author_id == author_id))
    }

    async fn list_followed_authors(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let state = self.state.read().await;
        let mut follows: Vec<_> = state
            .follows
            .values()
            .filter(|(_, follow)| follow.user_id == user_id)
            .collect();
        follows.sort_by_key(|(seq, _)| *seq);
        Ok(follows
            .into_iter()
            .map(|(_, follow)| follow.author_id)
            .collect())
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.write().await;
        state.ensure_user(params.user_id)?;

        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            token_hash: params.token_hash,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        let seq = state.next_seq();
        state.sessions.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .values()
            .find(|(_, session)| session.token_hash == token_hash)
            .map(|(_, session)| session.clone()))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state
            .sessions
            .retain(|_, (_, session)| session.token_hash != token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, (_, session)| !session.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl StoreHealth for MemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

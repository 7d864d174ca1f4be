//! Declared foreign-key relations and what happens to children when a parent
//! row is deleted.
//!
//! The table is the single source of truth for the in-process store's cascade
//! logic; the SQL migrations carry matching `ON DELETE` clauses.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
    Post,
    Comment,
    Follow,
    Session,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Post => "post",
            EntityKind::Comment => "comment",
            EntityKind::Follow => "follow",
            EntityKind::Session => "session",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the child rows as well.
    Cascade,
    /// Keep the child rows and clear the reference. Only valid for nullable keys.
    SetNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKey {
    PostGroup,
    PostAuthor,
    CommentPost,
    CommentAuthor,
    FollowUser,
    FollowAuthor,
    SessionUser,
}

impl ForeignKey {
    pub fn child(self) -> EntityKind {
        match self {
            ForeignKey::PostGroup | ForeignKey::PostAuthor => EntityKind::Post,
            ForeignKey::CommentPost | ForeignKey::CommentAuthor => EntityKind::Comment,
            ForeignKey::FollowUser | ForeignKey::FollowAuthor => EntityKind::Follow,
            ForeignKey::SessionUser => EntityKind::Session,
        }
    }

    pub fn parent(self) -> EntityKind {
        match self {
            ForeignKey::PostGroup => EntityKind::Group,
            ForeignKey::CommentPost => EntityKind::Post,
            ForeignKey::PostAuthor
            | ForeignKey::CommentAuthor
            | ForeignKey::FollowUser
            | ForeignKey::FollowAuthor
            | ForeignKey::SessionUser => EntityKind::User,
        }
    }

    pub fn on_delete(self) -> OnDelete {
        RELATIONS
            .iter()
            .find(|relation| relation.key == self)
            .map(|relation| relation.on_delete)
            .unwrap_or(OnDelete::Cascade)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub key: ForeignKey,
    pub on_delete: OnDelete,
}

pub const RELATIONS: &[Relation] = &[
    Relation {
        key: ForeignKey::PostGroup,
        on_delete: OnDelete::SetNull,
    },
    Relation {
        key: ForeignKey::PostAuthor,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        key: ForeignKey::CommentPost,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        key: ForeignKey::CommentAuthor,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        key: ForeignKey::FollowUser,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        key: ForeignKey::FollowAuthor,
        on_delete: OnDelete::Cascade,
    },
    Relation {
        key: ForeignKey::SessionUser,
        on_delete: OnDelete::Cascade,
    },
];

/// Relations whose parent side is `parent`, in declaration order.
pub fn referencing(parent: EntityKind) -> impl Iterator<Item = &'static Relation> {
    RELATIONS
        .iter()
        .filter(move |relation| relation.key.parent() == parent)
}

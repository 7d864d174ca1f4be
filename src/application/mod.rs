//! Application services: feed assembly, follows, posts, accounts and moderation.

pub mod accounts;
pub mod admin;
pub mod error;
pub mod feed;
pub mod follow;
pub mod pagination;
pub mod posts;
pub mod repos;

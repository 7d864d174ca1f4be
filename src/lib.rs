//! Postboard: a community blogging server with groups, comments and author feeds.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;

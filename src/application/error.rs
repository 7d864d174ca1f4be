use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        accounts::AccountError, admin::AdminError, feed::FeedError, follow::FollowError,
        posts::PostError,
    },
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error_to_http_error";
        match error {
            FeedError::UnknownGroup(slug) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown group",
                format!("Group `{slug}` does not exist"),
            ),
            FeedError::UnknownAuthor(username) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown author",
                format!("User `{username}` does not exist"),
            ),
            FeedError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::error::follow_error_to_http_error";
        match error {
            FollowError::UnknownAuthor(username) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown author",
                format!("User `{username}` does not exist"),
            ),
            FollowError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error_to_http_error";
        match error {
            PostError::NotFound(id) => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Unknown post",
                format!("Post `{id}` does not exist"),
            ),
            PostError::NotAuthor { post_id } => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Forbidden",
                format!("Viewer is not the author of post `{post_id}`"),
            ),
            PostError::Invalid(_) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid post",
                "Post form failed validation",
            ),
            err @ PostError::Media(_) => HttpError::internal(SOURCE, &err),
            PostError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<AccountError> for HttpError {
    fn from(error: AccountError) -> Self {
        const SOURCE: &str = "application::error::account_error_to_http_error";
        match error {
            AccountError::InvalidCredentials => HttpError::new(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Invalid credentials",
                "Username or password did not match",
            ),
            AccountError::Invalid(_) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid sign-up",
                "Sign-up form failed validation",
            ),
            err @ AccountError::Hashing(_) => HttpError::internal(SOURCE, &err),
            AccountError::Repo(err) => HttpError::internal(SOURCE, &err),
        }
    }
}

impl From<AdminError> for HttpError {
    fn from(error: AdminError) -> Self {
        const SOURCE: &str = "application::error::admin_error_to_http_error";
        match error {
            AdminError::InvalidGroup(message) => {
                HttpError::new(SOURCE, StatusCode::BAD_REQUEST, "Invalid group", message)
            }
            AdminError::Slug(err) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid slug",
                &err,
            ),
            AdminError::Repo(err) => crate::infra::http::repo_error_to_http(SOURCE, err),
        }
    }
}

/// Failures that abort the process during startup or serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::RepoError;

    #[test]
    fn report_collects_source_chain() {
        let error = FeedError::Repo(RepoError::from_persistence("connection reset"));
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(report.messages.len(), 1);
        assert!(report.messages[0].contains("connection reset"));
    }

    #[test]
    fn unknown_group_maps_to_not_found() {
        let error: HttpError = FeedError::UnknownGroup("cats".into()).into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_group_maps_to_conflict() {
        let error: HttpError = AdminError::Repo(RepoError::Duplicate {
            constraint: "groups_slug_key".into(),
        })
        .into();
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn infra_errors_pass_through_app_error() {
        let error = AppError::from(InfraError::configuration("database url is not configured"));
        assert_eq!(
            error.to_string(),
            "configuration error: database url is not configured"
        );
    }
}

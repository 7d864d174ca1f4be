mod accounts;
mod admin;
mod auth;
mod middleware;
mod posts;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use auth::SESSION_COOKIE;
pub use public::{HttpState, build_router};

use std::sync::Arc;

use crate::application::{
    accounts::AccountService,
    admin::AdminService,
    error::{ErrorReport, HttpError},
    feed::FeedService,
    follow::FollowService,
    posts::{MediaStore, PostService},
    repos::{RepoError, Repositories},
};
use crate::config::{AuthSettings, UploadSettings};
use crate::infra::{cache::PageCache, uploads::UploadStorage};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Router states for both listeners, wired over one set of repositories.
#[derive(Clone)]
pub struct ApplicationStates {
    pub http: HttpState,
    pub admin: AdminState,
}

impl ApplicationStates {
    pub fn new(
        repos: &Repositories,
        upload_storage: Arc<UploadStorage>,
        cache: Option<PageCache>,
        auth: &AuthSettings,
        uploads: &UploadSettings,
    ) -> Self {
        let media: Arc<dyn MediaStore> = upload_storage.clone();
        let feed = Arc::new(FeedService::new(
            repos.posts.clone(),
            repos.groups.clone(),
            repos.users.clone(),
            repos.follows.clone(),
        ));
        let follows = Arc::new(FollowService::new(
            repos.follows.clone(),
            repos.users.clone(),
        ));
        let posts = Arc::new(PostService::new(
            repos.posts.clone(),
            repos.posts_write.clone(),
            repos.groups.clone(),
            repos.comments.clone(),
            media,
        ));
        let accounts = Arc::new(AccountService::new(
            repos.users.clone(),
            repos.sessions.clone(),
            auth.session_ttl,
        ));
        let admin = Arc::new(AdminService::new(
            repos.groups.clone(),
            repos.posts_write.clone(),
            repos.users.clone(),
        ));

        let http = HttpState {
            feed,
            follows,
            posts,
            accounts,
            health: repos.health.clone(),
            upload_storage,
            cache: cache.clone(),
            secure_cookies: auth.secure_cookies,
            upload_body_limit: usize::try_from(uploads.max_request_bytes.get())
                .unwrap_or(usize::MAX),
        };
        let admin = AdminState {
            admin,
            health: repos.health.clone(),
            cache,
        };

        Self { http, admin }
    }
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// `303 See Other` to a local path.
fn see_other(location: &str) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => {
            response
                .headers_mut()
                .insert(header::LOCATION, HeaderValue::from_static("/"));
        }
    }
    response
}

/// Map a repository error to a consistent HTTP error response for admin/public surfaces.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_map_to_conflict() {
        let err = repo_error_to_http(
            "test",
            RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            },
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            repo_error_to_http("test", RepoError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn see_other_sets_location() {
        let response = see_other("/profile/alice/");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/profile/alice/"
        );
    }
}

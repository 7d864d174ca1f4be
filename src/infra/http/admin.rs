//! Operations listener: health, cache control and moderation deletes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tracing::info;

use crate::application::{
    admin::{AdminService, NewGroup},
    error::HttpError,
    repos::StoreHealth,
};
use crate::infra::cache::PageCache;

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
    public::parse_post_id,
};

const SOURCE: &str = "infra::http::admin";

#[derive(Clone)]
pub struct AdminState {
    pub admin: Arc<AdminService>,
    pub health: Arc<dyn StoreHealth>,
    pub cache: Option<PageCache>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin_health))
        .route("/cache/clear", post(clear_cache))
        .route("/groups", post(create_group))
        .route("/groups/{slug}", delete(delete_group))
        .route("/posts/{id}", delete(delete_post))
        .route("/users/{username}", delete(delete_user))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn clear_cache(State(state): State<AdminState>) -> Response {
    if let Some(cache) = state.cache.as_ref() {
        cache.clear().await;
        info!(target = "postboard::http::admin", "page cache cleared");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn create_group(State(state): State<AdminState>, Json(input): Json<NewGroup>) -> Response {
    match state.admin.create_group(input).await {
        Ok(group) => (StatusCode::CREATED, Json(group)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn delete_group(State(state): State<AdminState>, Path(slug): Path<String>) -> Response {
    match state.admin.delete_group(&slug).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn delete_post(State(state): State<AdminState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_post_id(&id) else {
        return HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Resource not found",
            format!("`{id}` is not a post id"),
        )
        .into_response();
    };
    match state.admin.delete_post(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn delete_user(State(state): State<AdminState>, Path(username): Path<String>) -> Response {
    match state.admin.delete_user(&username).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        accounts::AccountService,
        error::HttpError,
        feed::{FeedError, FeedService},
        follow::{FollowError, FollowService},
        pagination::PageParam,
        posts::{PostError, PostService},
        repos::StoreHealth,
    },
    domain::{entities::UserRecord, viewer::Viewer},
    infra::{assets, cache::PageCache, uploads::UploadStorage},
    presentation::views::{
        FollowFeedTemplate, GroupTemplate, GroupView, IndexTemplate, LayoutContext, ListingView,
        NavView, PostDetailTemplate, PostDetailView, ProfileTemplate, ProfileView,
        profile_href, render_not_found_response, render_template_response,
    },
};

use super::{
    accounts, auth, db_health_response,
    middleware::{log_responses, page_cache_layer, set_request_context},
    posts, see_other,
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub posts: Arc<PostService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn StoreHealth>,
    pub upload_storage: Arc<UploadStorage>,
    /// `None` when page caching is disabled.
    pub cache: Option<PageCache>,
    pub secure_cookies: bool,
    pub upload_body_limit: usize,
}

pub fn build_router(state: HttpState) -> Router {
    // Cache outside viewer resolution: a hit answers before any session lookup.
    let home = Router::new()
        .route("/", get(index))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_viewer,
        ));
    let home = match state.cache.clone() {
        Some(cache) => home.layer(middleware::from_fn_with_state(cache, page_cache_layer)),
        None => home,
    };

    let login_required = Router::new()
        .route(
            "/create/",
            get(posts::create_form).post(posts::create_submit),
        )
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .layer(DefaultBodyLimit::max(state.upload_body_limit))
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/follow/", get(follow_index))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .layer(middleware::from_fn(auth::require_login));

    let viewer_routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup_submit),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route(
            "/auth/logout/",
            get(accounts::logout).post(accounts::logout),
        )
        .merge(login_required)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_viewer,
        ));

    let static_routes = Router::new()
        .route("/_health/db", get(public_health))
        .route("/media/{*path}", get(serve_media))
        .route("/static/{*path}", get(assets::serve_static));

    home.merge(viewer_routes)
        .merge(static_routes)
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub(super) fn param(&self) -> PageParam {
        PageParam::parse(self.page.as_deref())
    }
}

async fn index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    match state.feed.home(query.param()).await {
        Ok(page) => {
            let listing = ListingView::new("Latest posts", &page, "No posts yet.");
            let view = LayoutContext::new(nav, "Latest posts", listing);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, nav),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    match state.feed.group(&slug, query.param()).await {
        Ok(listing) => {
            let content = GroupView::from(&listing);
            let view = LayoutContext::new(nav, content.title.clone(), content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, nav),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    match state.feed.profile(&viewer, &username, query.param()).await {
        Ok(listing) => {
            let content = ProfileView::from(&listing);
            let view = LayoutContext::new(nav, format!("Profile of {}", content.username), content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, nav),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    let Some(id) = parse_post_id(&id) else {
        return render_not_found_response(nav);
    };

    match state.posts.detail(id).await {
        Ok(detail) => {
            let content = PostDetailView::new(&detail, &viewer);
            let title = post_title(&detail.entry.post.text);
            let view = LayoutContext::new(nav, title, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_response(err, nav),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<PageQuery>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    let Some(user_id) = viewer.id() else {
        return see_other("/auth/login/?next=/follow/");
    };

    match state.feed.followed(user_id, query.param()).await {
        Ok(page) => {
            let listing = ListingView::new(
                "Posts from authors you follow",
                &page,
                "Follow some authors to fill this feed.",
            );
            let view = LayoutContext::new(nav, "Following", listing);
            render_template_response(FollowFeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, nav),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
) -> Response {
    let Some(user_id) = viewer.id() else {
        return see_other(&profile_href(&username));
    };
    let result = state.follows.follow_username(user_id, &username).await;
    follow_result_response(result, &viewer)
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
) -> Response {
    let Some(user_id) = viewer.id() else {
        return see_other(&profile_href(&username));
    };
    let result = state.follows.unfollow_username(user_id, &username).await;
    follow_result_response(result, &viewer)
}

fn follow_result_response(
    result: Result<UserRecord, FollowError>,
    viewer: &Viewer,
) -> Response {
    match result {
        Ok(author) => see_other(&profile_href(&author.username)),
        Err(FollowError::UnknownAuthor(_)) => render_not_found_response(NavView::for_viewer(viewer)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    state.upload_storage.serve(&path).await
}

async fn fallback_router() -> Response {
    render_not_found_response(NavView::neutral())
}

pub(super) fn parse_post_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

pub(super) fn feed_error_response(err: FeedError, nav: NavView) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) => render_not_found_response(nav),
        err => HttpError::from(err).into_response(),
    }
}

pub(super) fn post_error_response(err: PostError, nav: NavView) -> Response {
    match err {
        PostError::NotFound(_) => render_not_found_response(nav),
        err => HttpError::from(err).into_response(),
    }
}

/// First few words of a post, used as the page title.
fn post_title(text: &str) -> String {
    const LIMIT: usize = 30;
    let mut title: String = text.chars().take(LIMIT).collect();
    if text.chars().count() > LIMIT {
        title.push('…');
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_post_ids_do_not_parse() {
        assert!(parse_post_id("not-a-uuid").is_none());
        assert!(parse_post_id("42").is_none());
        assert!(parse_post_id(&Uuid::new_v4().to_string()).is_some());
    }

    #[test]
    fn post_titles_are_truncated() {
        assert_eq!(post_title("short"), "short");
        let long = "a".repeat(40);
        assert_eq!(post_title(&long).chars().count(), 31);
    }

    #[test]
    fn invalid_page_query_means_first_page() {
        let query = PageQuery {
            page: Some("abc".to_string()),
        };
        assert_eq!(query.param(), PageParam::First);
    }
}

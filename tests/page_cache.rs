mod support;

use axum::http::StatusCode;
use std::time::Duration;
use support::{HOME_TTL, TestApp, body_text};

#[tokio::test]
async fn deleted_post_stays_on_cached_home_until_the_window_ends() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let post = app.post(&author, "soon to be deleted", None).await;

    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("soon to be deleted"));

    let response = app
        .admin("DELETE", &format!("/posts/{}", post.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.clock.advance(HOME_TTL - Duration::from_secs(1));
    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("soon to be deleted"));

    app.clock.advance(Duration::from_secs(1));
    let html = body_text(app.get("/", None).await).await;
    assert!(!html.contains("soon to be deleted"));
}

#[tokio::test]
async fn clearing_the_cache_shows_fresh_content() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let post = app.post(&author, "cached text", None).await;

    body_text(app.get("/", None).await).await;
    app.admin("DELETE", &format!("/posts/{}", post.id), None)
        .await;

    let response = app.admin("POST", "/cache/clear", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.cache.is_empty().await);

    let html = body_text(app.get("/", None).await).await;
    assert!(!html.contains("cached text"));
}

#[tokio::test]
async fn each_page_is_cached_separately() {
    let app = TestApp::new();
    let author = app.user("author").await;
    app.post(&author, "only post", None).await;

    body_text(app.get("/", None).await).await;
    body_text(app.get("/?page=2", None).await).await;
    assert_eq!(app.cache.len().await, 2);
}

#[tokio::test]
async fn other_listings_are_never_cached() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let post = app.post(&author, "profile text", None).await;

    body_text(app.get("/profile/author/", None).await).await;
    app.admin("DELETE", &format!("/posts/{}", post.id), None)
        .await;

    let html = body_text(app.get("/profile/author/", None).await).await;
    assert!(!html.contains("profile text"));
    assert!(app.cache.is_empty().await);
}

#[tokio::test]
async fn signed_in_home_shows_the_viewer_and_is_cached_per_session() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let carol = app.user("carol").await;
    app.post(&carol, "hello everyone", None).await;
    let alice_cookie = app.session_cookie(&alice).await;
    let bob_cookie = app.session_cookie(&bob).await;

    let anonymous = body_text(app.get("/", None).await).await;
    assert!(anonymous.contains("Log in"));
    assert!(!anonymous.contains("Log out"));

    let as_alice = body_text(app.get("/", Some(&alice_cookie)).await).await;
    assert!(as_alice.contains(">alice</a>"));
    assert!(as_alice.contains("Log out"));

    let as_bob = body_text(app.get("/", Some(&bob_cookie)).await).await;
    assert!(as_bob.contains(">bob</a>"));
    assert!(!as_bob.contains(">alice</a>"));

    assert_eq!(app.cache.len().await, 3);

    let again = body_text(app.get("/", None).await).await;
    assert!(!again.contains("Log out"));
}

#[tokio::test]
async fn cached_signed_in_home_survives_session_removal_until_the_window_ends() {
    let app = TestApp::new();
    let alice = app.user("alice").await;
    let cookie = app.session_cookie(&alice).await;

    let first = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(first.contains("Log out"));

    // A hit is answered before the session is looked up.
    app.admin("DELETE", "/users/alice", None).await;
    let cached = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(cached.contains("Log out"));

    app.clock.advance(HOME_TTL);
    let fresh = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(!fresh.contains("Log out"));
}

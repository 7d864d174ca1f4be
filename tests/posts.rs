mod support;

use axum::http::StatusCode;
use postboard::application::repos::PostFilter;
use support::{TestApp, body_text, card_count, location};

#[tokio::test]
async fn created_post_appears_on_the_author_profile() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    let response = app
        .post_multipart("/create/", &[("text", "Hello"), ("group", "")], Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/author/");

    let posts = app
        .repos
        .posts
        .list_posts(&PostFilter::Author(author.id), 0, 10)
        .await
        .expect("list posts");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].post.text, "Hello");
    assert_eq!(posts[0].author_username, "author");
    assert!(posts[0].group.is_none());

    let html = body_text(app.get("/profile/author/", None).await).await;
    assert_eq!(card_count(&html), 1);
    assert!(html.contains("Hello"));
}

#[tokio::test]
async fn post_can_be_filed_under_a_group() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let group = app.group("Travel", "travel").await;
    let cookie = app.session_cookie(&author).await;

    let group_id = group.id.to_string();
    app.post_multipart(
        "/create/",
        &[("text", "Trip report"), ("group", &group_id)],
        Some(&cookie),
    )
    .await;

    let html = body_text(app.get("/group/travel/", None).await).await;
    assert!(html.contains("Trip report"));
}

#[tokio::test]
async fn blank_text_re_renders_the_form() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    let response = app
        .post_multipart("/create/", &[("text", "   "), ("group", "")], Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This field is required."));
}

#[tokio::test]
async fn unknown_group_is_a_field_error() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    let missing = uuid::Uuid::new_v4().to_string();
    let response = app
        .post_multipart(
            "/create/",
            &[("text", "Hello"), ("group", &missing)],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Select a valid choice."));
}

#[tokio::test]
async fn anonymous_create_goes_to_login() {
    let app = TestApp::new();

    let response = app.get("/create/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=/create/");
}

#[tokio::test]
async fn non_author_edit_redirects_to_detail() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let other = app.user("other").await;
    let post = app.post(&author, "original", None).await;
    let cookie = app.session_cookie(&other).await;
    let detail = format!("/posts/{}/", post.id);

    let response = app.get(&format!("{detail}edit/"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let response = app
        .post_multipart(&format!("{detail}edit/"), &[("text", "hijacked")], Some(&cookie))
        .await;
    assert_eq!(location(&response), detail);

    let stored = app
        .repos
        .posts
        .find_post(post.id)
        .await
        .expect("find")
        .expect("post exists");
    assert_eq!(stored.text, "original");
}

#[tokio::test]
async fn author_edit_updates_text_and_keeps_creation_time() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let post = app.post(&author, "draft", None).await;
    let cookie = app.session_cookie(&author).await;
    let detail = format!("/posts/{}/", post.id);

    let form = body_text(app.get(&format!("{detail}edit/"), Some(&cookie)).await).await;
    assert!(form.contains("draft"));

    let response = app
        .post_multipart(
            &format!("{detail}edit/"),
            &[("text", "final"), ("group", "")],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let stored = app
        .repos
        .posts
        .find_post(post.id)
        .await
        .expect("find")
        .expect("post exists");
    assert_eq!(stored.text, "final");
    assert_eq!(stored.created_at, post.created_at);
    assert_eq!(stored.author_id, author.id);
}

#[tokio::test]
async fn anonymous_edit_goes_to_login() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let post = app.post(&author, "text", None).await;

    let path = format!("/posts/{}/edit/", post.id);
    let response = app.get(&path, None).await;
    assert_eq!(location(&response), format!("/auth/login/?next={path}"));
}

#[tokio::test]
async fn comments_are_added_and_blank_ones_dropped() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let post = app.post(&author, "discuss", None).await;
    let cookie = app.session_cookie(&reader).await;
    let detail = format!("/posts/{}/", post.id);

    let response = app
        .post_form(&format!("{detail}comment/"), "text=Nice+post", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let response = app
        .post_form(&format!("{detail}comment/"), "text=+++", Some(&cookie))
        .await;
    assert_eq!(location(&response), detail);

    let comments = app
        .repos
        .comments
        .list_comments_for_post(post.id)
        .await
        .expect("comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment.text, "Nice post");

    let html = body_text(app.get(&detail, None).await).await;
    assert!(html.contains("Nice post"));
    assert!(html.contains("to comment."));
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_not_found() {
    let app = TestApp::new();
    let reader = app.user("reader").await;
    let cookie = app.session_cookie(&reader).await;

    let path = format!("/posts/{}/comment/", uuid::Uuid::new_v4());
    let response = app.post_form(&path, "text=hello", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_shows_comment_form_only_to_signed_in_viewers() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let post = app.post(&author, "body", None).await;
    let cookie = app.session_cookie(&author).await;
    let detail = format!("/posts/{}/", post.id);

    let html = body_text(app.get(&detail, Some(&cookie)).await).await;
    assert!(html.contains("name=\"text\""));
    assert!(html.contains("edit/"));

    let html = body_text(app.get(&detail, None).await).await;
    assert!(!html.contains("name=\"text\""));
}

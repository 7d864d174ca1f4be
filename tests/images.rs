mod support;

use axum::http::{StatusCode, header};
use postboard::{application::repos::PostFilter, domain::entities::PostRecord};
use support::{FilePart, TINY_GIF, TestApp, body_text, location};

async fn only_post(app: &TestApp, author: uuid::Uuid) -> PostRecord {
    let posts = app
        .repos
        .posts
        .list_posts(&PostFilter::Author(author), 0, 10)
        .await
        .expect("list posts");
    assert_eq!(posts.len(), 1);
    posts.into_iter().next().expect("one post").post
}

async fn reload(app: &TestApp, post: &PostRecord) -> PostRecord {
    app.repos
        .posts
        .find_post(post.id)
        .await
        .expect("find")
        .expect("post exists")
}

#[tokio::test]
async fn uploaded_image_is_shown_on_every_listing_and_served() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let group = app.group("Photos", "photos").await;
    let cookie = app.session_cookie(&author).await;

    let group_id = group.id.to_string();
    let response = app
        .post_multipart_with_files(
            "/create/",
            &[("text", "Look at this"), ("group", &group_id)],
            &[FilePart::image("small.gif", TINY_GIF)],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/author/");

    let post = only_post(&app, author.id).await;
    let stored = post.image_path.clone().expect("image stored");
    assert!(stored.starts_with("posts/"));
    assert!(stored.ends_with(".gif"));
    assert!(app.media_file(&stored).exists());

    let file_name = stored.rsplit('/').next().expect("file name");
    let detail = format!("/posts/{}/", post.id);
    for page in ["/", "/profile/author/", "/group/photos/", detail.as_str()] {
        let html = body_text(app.get(page, None).await).await;
        assert!(html.contains("<img src="), "{page}");
        assert!(html.contains(file_name), "{page}");
    }

    let response = app.get(&format!("/media/{stored}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/gif"
    );
}

#[tokio::test]
async fn non_image_upload_re_renders_the_form() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    let response = app
        .post_multipart_with_files(
            "/create/",
            &[("text", "Not a picture"), ("group", "")],
            &[FilePart::image("notes.gif", b"plain text, not a gif")],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Upload a valid image."));
    assert!(html.contains("Not a picture"));

    let posts = app
        .repos
        .posts
        .count_posts(&PostFilter::Author(author.id))
        .await
        .expect("count");
    assert_eq!(posts, 0);
}

#[tokio::test]
async fn replacing_an_image_removes_the_old_file() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    app.post_multipart_with_files(
        "/create/",
        &[("text", "first picture"), ("group", "")],
        &[FilePart::image("first.gif", TINY_GIF)],
        Some(&cookie),
    )
    .await;
    let post = only_post(&app, author.id).await;
    let first = post.image_path.clone().expect("first image");

    let edit = format!("/posts/{}/edit/", post.id);
    let form = body_text(app.get(&edit, Some(&cookie)).await).await;
    assert!(form.contains("name=\"image_clear\""));

    let response = app
        .post_multipart_with_files(
            &edit,
            &[("text", "second picture"), ("group", "")],
            &[FilePart::image("second.gif", TINY_GIF)],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let updated = reload(&app, &post).await;
    let second = updated.image_path.expect("second image");
    assert_ne!(second, first);
    assert!(app.media_file(&second).exists());
    assert!(!app.media_file(&first).exists());
}

#[tokio::test]
async fn clearing_an_image_detaches_and_removes_it() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    app.post_multipart_with_files(
        "/create/",
        &[("text", "temporary picture"), ("group", "")],
        &[FilePart::image("gone.gif", TINY_GIF)],
        Some(&cookie),
    )
    .await;
    let post = only_post(&app, author.id).await;
    let stored = post.image_path.clone().expect("image stored");

    let edit = format!("/posts/{}/edit/", post.id);
    let response = app
        .post_multipart(
            &edit,
            &[("text", "no picture"), ("group", ""), ("image_clear", "on")],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let updated = reload(&app, &post).await;
    assert!(updated.image_path.is_none());
    assert!(!app.media_file(&stored).exists());

    let html = body_text(app.get(&format!("/posts/{}/", post.id), None).await).await;
    assert!(!html.contains("<img src="));
}

#[tokio::test]
async fn editing_text_alone_keeps_the_image() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let cookie = app.session_cookie(&author).await;

    app.post_multipart_with_files(
        "/create/",
        &[("text", "keep me"), ("group", "")],
        &[FilePart::image("kept.gif", TINY_GIF)],
        Some(&cookie),
    )
    .await;
    let post = only_post(&app, author.id).await;
    let stored = post.image_path.clone().expect("image stored");

    app.post_multipart(
        &format!("/posts/{}/edit/", post.id),
        &[("text", "kept, reworded"), ("group", "")],
        Some(&cookie),
    )
    .await;

    let updated = reload(&app, &post).await;
    assert_eq!(updated.image_path.as_deref(), Some(stored.as_str()));
    assert!(app.media_file(&stored).exists());
}

mod support;

use axum::http::StatusCode;
use support::{TestApp, body_text, card_count, location};

#[tokio::test]
async fn following_fills_the_feed_and_unfollowing_empties_it() {
    let app = TestApp::new();
    let reader = app.user("reader").await;
    let writer = app.user("writer").await;
    let stranger = app.user("stranger").await;
    app.post(&writer, "from the writer", None).await;
    app.post(&stranger, "from a stranger", None).await;
    let cookie = app.session_cookie(&reader).await;

    let response = app.get("/profile/writer/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/writer/");

    let feed = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert!(feed.contains("from the writer"));
    assert!(!feed.contains("from a stranger"));
    assert_eq!(card_count(&feed), 1);

    let profile = body_text(app.get("/profile/writer/", Some(&cookie)).await).await;
    assert!(profile.contains("Unfollow"));

    app.get("/profile/writer/unfollow/", Some(&cookie)).await;
    let feed = body_text(app.get("/follow/", Some(&cookie)).await).await;
    assert_eq!(card_count(&feed), 0);
}

#[tokio::test]
async fn repeated_follow_creates_one_edge() {
    let app = TestApp::new();
    let reader = app.user("reader").await;
    let writer = app.user("writer").await;
    let cookie = app.session_cookie(&reader).await;

    app.get("/profile/writer/follow/", Some(&cookie)).await;
    app.get("/profile/writer/follow/", Some(&cookie)).await;

    let followed = app
        .repos
        .follows
        .list_followed_authors(reader.id)
        .await
        .expect("followed authors");
    assert_eq!(followed, vec![writer.id]);
}

#[tokio::test]
async fn self_follow_is_ignored() {
    let app = TestApp::new();
    let writer = app.user("writer").await;
    let cookie = app.session_cookie(&writer).await;

    let response = app.get("/profile/writer/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(
        !app.repos
            .follows
            .follow_exists(writer.id, writer.id)
            .await
            .expect("exists")
    );

    let profile = body_text(app.get("/profile/writer/", Some(&cookie)).await).await;
    assert!(!profile.contains(">Follow<"));
}

#[tokio::test]
async fn feed_order_does_not_depend_on_follow_order() {
    let app = TestApp::new();
    let reader = app.user("reader").await;
    let first = app.user("first").await;
    let second = app.user("second").await;
    app.post(&first, "older post", None).await;
    app.post(&second, "newer post", None).await;
    let cookie = app.session_cookie(&reader).await;

    app.get("/profile/second/follow/", Some(&cookie)).await;
    app.get("/profile/first/follow/", Some(&cookie)).await;

    let feed = body_text(app.get("/follow/", Some(&cookie)).await).await;
    let newer = feed.find("newer post").expect("newer post listed");
    let older = feed.find("older post").expect("older post listed");
    assert!(newer < older);
}

#[tokio::test]
async fn following_an_unknown_author_is_not_found() {
    let app = TestApp::new();
    let reader = app.user("reader").await;
    let cookie = app.session_cookie(&reader).await;

    let response = app.get("/profile/ghost/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_follow_goes_to_login() {
    let app = TestApp::new();
    app.user("writer").await;

    let response = app.get("/profile/writer/follow/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/auth/login/?next=/profile/writer/follow/"
    );

    let response = app.get("/follow/", None).await;
    assert_eq!(location(&response), "/auth/login/?next=/follow/");
}

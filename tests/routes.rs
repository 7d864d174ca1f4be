mod support;

use axum::http::{StatusCode, header};
use support::{TestApp, body_text};

#[tokio::test]
async fn unknown_routes_render_the_not_found_page() {
    let app = TestApp::new();

    let response = app.get("/no/such/page/", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}

#[tokio::test]
async fn unresolvable_identifiers_are_not_found() {
    let app = TestApp::new();

    for path in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/not-a-uuid/",
        &format!("/posts/{}/", uuid::Uuid::new_v4()),
    ] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn stylesheet_and_health_are_served() {
    let app = TestApp::new();

    let response = app.get("/static/app.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css"
    );

    let response = app.get("/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get("/media/posts/missing.png", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn operations_listener_manages_groups() {
    let app = TestApp::new();

    let response = app.admin("GET", "/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = r#"{"title": "Cats", "slug": "cats", "description": "All about cats"}"#;
    let response = app.admin("POST", "/groups", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(created["slug"], "cats");

    let response = app.admin("POST", "/groups", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .admin("POST", "/groups", Some(r#"{"title": "Bad", "slug": "no spaces"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let html = body_text(app.get("/group/cats/", None).await).await;
    assert!(html.contains("All about cats"));

    let response = app.admin("DELETE", "/groups/cats", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.admin("DELETE", "/groups/cats", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_unknown_targets_is_not_found() {
    let app = TestApp::new();

    let response = app
        .admin("DELETE", &format!("/posts/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.admin("DELETE", "/users/nobody", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

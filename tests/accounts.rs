mod support;

use axum::http::{StatusCode, header};
use postboard::infra::http::SESSION_COOKIE;
use support::{TestApp, body_text, location};

fn session_from(response: &axum::http::Response<axum::body::Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(|value| value.split(';').next().unwrap_or_default().to_string())
}

#[tokio::test]
async fn signup_login_and_logout() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/auth/signup/",
            "username=newbie&password=correct-horse&password_confirm=correct-horse",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let signup_cookie = session_from(&response).expect("session cookie");
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let response = app.get("/create/", Some(&signup_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form(
            "/auth/login/",
            "username=newbie&password=wrong-password&next=%2Fcreate%2F",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("correct username and password"));

    let response = app
        .post_form(
            "/auth/login/",
            "username=newbie&password=correct-horse&next=%2Fcreate%2F",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/create/");
    let login_cookie = session_from(&response).expect("session cookie");

    let response = app.get("/auth/logout/", Some(&login_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.get("/create/", Some(&login_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=/create/");
}

#[tokio::test]
async fn signup_errors_re_render_the_form() {
    let app = TestApp::new();
    app.user("taken").await;

    let response = app
        .post_form(
            "/auth/signup/",
            "username=taken&password=short&password_confirm=different",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("class=\"error\""));
}

#[tokio::test]
async fn external_next_targets_are_ignored() {
    let app = TestApp::new();

    let html = body_text(app.get("/auth/login/?next=https://evil.example/", None).await).await;
    assert!(html.contains("name=\"next\" value=\"\""));

    let html = body_text(app.get("/auth/login/?next=/follow/", None).await).await;
    assert!(html.contains("value=\"/follow/\""));
}

#[tokio::test]
async fn unknown_session_tokens_are_anonymous() {
    let app = TestApp::new();

    let cookie = format!("{SESSION_COOKIE}=deadbeef");
    let response = app.get("/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

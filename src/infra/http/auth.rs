//! Session cookie resolution and the login guard.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use tracing::warn;

use crate::{
    application::accounts::IssuedSession, domain::viewer::Viewer, presentation::views::login_href,
};

use super::{HttpState, see_other};

pub const SESSION_COOKIE: &str = "postboard_session";

/// Attach the request's `Viewer` as an extension. Unknown, expired or
/// unreadable sessions resolve to an anonymous viewer.
pub(super) async fn resolve_viewer(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.accounts.authenticate(cookie.value()).await {
            Ok(viewer) => viewer,
            Err(err) => {
                warn!(
                    target = "postboard::http::auth",
                    error = %err,
                    "session lookup failed, treating request as anonymous"
                );
                Viewer::Anonymous
            }
        },
        None => Viewer::Anonymous,
    };

    request.extensions_mut().insert(viewer.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(viewer);
    response
}

/// Redirect anonymous viewers to the login form, remembering where they were going.
pub(super) async fn require_login(request: Request<Body>, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<Viewer>()
        .is_some_and(Viewer::is_authenticated);
    if authenticated {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    see_other(&login_href(&target))
}

pub(super) fn session_cookie(session: &IssuedSession, secure: bool) -> Cookie<'static> {
    let remaining = session.expires_at - OffsetDateTime::now_utc();
    Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(remaining)
        .build()
}

pub(super) fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Accept only local absolute paths as post-login destinations.
pub(super) fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(char::is_control);
    local.then(|| next.to_string())
}

pub(super) fn redirect_with_jar(jar: CookieJar, location: &str) -> Response {
    (jar, see_other(location)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(safe_next(Some("/create/")).as_deref(), Some("/create/"));
        assert_eq!(
            safe_next(Some("/follow/?page=2")).as_deref(),
            Some("/follow/?page=2")
        );
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("//evil.example/")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn session_cookie_is_http_only_and_lax() {
        let session = IssuedSession {
            token: "abc".to_string(),
            expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
        };
        let cookie = session_cookie(&session, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}

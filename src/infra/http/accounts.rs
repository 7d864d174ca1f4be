use axum::{
    Extension, Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    application::{
        accounts::{AccountError, SignupForm},
        error::HttpError,
    },
    domain::viewer::Viewer,
    presentation::views::{
        LayoutContext, LoginTemplate, LoginView, NavView, SignupTemplate, SignupView,
        render_template_response,
    },
};

use super::{
    HttpState,
    auth::{SESSION_COOKIE, clear_session_cookie, redirect_with_jar, safe_next, session_cookie},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupFormInput {
    username: String,
    password: String,
    password_confirm: String,
}

pub(super) async fn signup_form(Extension(viewer): Extension<Viewer>) -> Response {
    render_signup(NavView::for_viewer(&viewer), SignupView::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    jar: CookieJar,
    Form(input): Form<SignupFormInput>,
) -> Response {
    let form = SignupForm {
        username: input.username,
        password: input.password,
        password_confirm: input.password_confirm,
    };

    match state.accounts.signup(&form).await {
        Ok((user, session)) => {
            info!(
                target = "postboard::http::accounts",
                user_id = %user.id,
                username = %user.username,
                "account created"
            );
            let jar = jar.add(session_cookie(&session, state.secure_cookies));
            redirect_with_jar(jar, "/")
        }
        Err(AccountError::Invalid(errors)) => render_signup(
            NavView::for_viewer(&viewer),
            SignupView {
                username: form.username,
                errors,
            },
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn login_form(
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<NextQuery>,
) -> Response {
    let view = LoginView {
        next: safe_next(query.next.as_deref()).unwrap_or_default(),
        ..LoginView::default()
    };
    render_login(NavView::for_viewer(&viewer), view)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    Extension(viewer): Extension<Viewer>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());

    match state.accounts.login(form.username.trim(), &form.password).await {
        Ok((user, session)) => {
            info!(
                target = "postboard::http::accounts",
                user_id = %user.id,
                "user logged in"
            );
            let jar = jar.add(session_cookie(&session, state.secure_cookies));
            redirect_with_jar(jar, next.as_deref().unwrap_or("/"))
        }
        Err(AccountError::InvalidCredentials) => render_login(
            NavView::for_viewer(&viewer),
            LoginView {
                username: form.username,
                next: next.unwrap_or_default(),
                error: Some(
                    "Please enter a correct username and password. Note that both fields may be case-sensitive."
                        .to_string(),
                ),
            },
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        warn!(
            target = "postboard::http::accounts",
            error = %err,
            "failed to delete session on logout"
        );
    }
    redirect_with_jar(clear_session_cookie(jar), "/")
}

fn render_login(nav: NavView, view: LoginView) -> Response {
    let view = LayoutContext::new(nav, "Log in", view);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_signup(nav: NavView, view: SignupView) -> Response {
    let view = LayoutContext::new(nav, "Sign up", view);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

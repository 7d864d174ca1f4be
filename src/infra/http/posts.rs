use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        posts::{ImageUpload, PostError, PostSubmission},
    },
    domain::viewer::Viewer,
    presentation::views::{
        LayoutContext, NavView, PostFormTemplate, PostFormView, post_href, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{
    public::{parse_post_id, post_error_response},
    see_other,
};

const SOURCE: &str = "infra::http::posts";

pub(super) async fn create_form(
    State(state): State<super::HttpState>,
    Extension(viewer): Extension<Viewer>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    match state.posts.group_choices().await {
        Ok(groups) => render_form(nav, PostFormView::create(&groups)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn create_submit(
    State(state): State<super::HttpState>,
    Extension(viewer): Extension<Viewer>,
    mut multipart: Multipart,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    let (Some(author_id), Some(username)) = (viewer.id(), viewer.username()) else {
        return see_other("/auth/login/?next=/create/");
    };

    let submission = match read_submission(&mut multipart).await {
        Ok(submission) => submission,
        Err(err) => return multipart_error_response(&err),
    };
    let (text, group) = (submission.text.clone(), submission.group.clone());

    match state.posts.create(author_id, submission).await {
        Ok(_) => see_other(&profile_href(username)),
        Err(PostError::Invalid(errors)) => match state.posts.group_choices().await {
            Ok(groups) => render_form(
                nav,
                PostFormView::create(&groups).rejected(&text, &group, &groups, errors),
            ),
            Err(err) => HttpError::from(err).into_response(),
        },
        Err(err) => post_error_response(err, nav),
    }
}

pub(super) async fn edit_form(
    State(state): State<super::HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    let (Some(editor_id), Some(id)) = (viewer.id(), parse_post_id(&id)) else {
        return render_not_found_response(nav);
    };

    let post = match state.posts.editable(editor_id, id).await {
        Ok(post) => post,
        Err(err) => return edit_error_response(err, id, nav),
    };
    match state.posts.group_choices().await {
        Ok(groups) => render_form(nav, PostFormView::edit(&post, &groups)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_submit(
    State(state): State<super::HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    let (Some(editor_id), Some(id)) = (viewer.id(), parse_post_id(&id)) else {
        return render_not_found_response(nav);
    };

    // Authorship is settled before the body is read.
    let post = match state.posts.editable(editor_id, id).await {
        Ok(post) => post,
        Err(err) => return edit_error_response(err, id, nav),
    };

    let submission = match read_submission(&mut multipart).await {
        Ok(submission) => submission,
        Err(err) => return multipart_error_response(&err),
    };
    let (text, group) = (submission.text.clone(), submission.group.clone());

    match state.posts.update(editor_id, id, submission).await {
        Ok(_) => see_other(&post_href(&id.to_string())),
        Err(PostError::Invalid(errors)) => match state.posts.group_choices().await {
            Ok(groups) => render_form(
                nav,
                PostFormView::edit(&post, &groups).rejected(&text, &group, &groups, errors),
            ),
            Err(err) => HttpError::from(err).into_response(),
        },
        Err(err) => edit_error_response(err, id, nav),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<super::HttpState>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let nav = NavView::for_viewer(&viewer);
    let (Some(author_id), Some(post_id)) = (viewer.id(), parse_post_id(&id)) else {
        return render_not_found_response(nav);
    };

    match state.posts.add_comment(author_id, post_id, &form.text).await {
        Ok(_) => see_other(&post_href(&post_id.to_string())),
        Err(err) => post_error_response(err, nav),
    }
}

fn render_form(nav: NavView, form: PostFormView) -> Response {
    let title = if form.is_edit { "Edit post" } else { "New post" };
    let view = LayoutContext::new(nav, title, form);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn edit_error_response(err: PostError, id: Uuid, nav: NavView) -> Response {
    match err {
        PostError::NotAuthor { .. } => see_other(&post_href(&id.to_string())),
        err => post_error_response(err, nav),
    }
}

fn multipart_error_response(err: &MultipartError) -> Response {
    HttpError::from_error(SOURCE, err.status(), "Invalid form submission", err).into_response()
}

async fn read_submission(multipart: &mut Multipart) -> Result<PostSubmission, MultipartError> {
    let mut submission = PostSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("text") => submission.text = field.text().await?,
            Some("group") => submission.group = field.text().await?,
            Some("image_clear") => {
                let value = field.text().await?.trim().to_ascii_lowercase();
                submission.clear_image = matches!(value.as_str(), "on" | "true" | "1" | "yes");
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().trim().to_string();
                let data = field.bytes().await?;
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                submission.image = Some(ImageUpload { filename, data });
            }
            _ => continue,
        }
    }

    Ok(submission)
}

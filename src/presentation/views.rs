use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::application::{
    accounts::SignupErrors,
    feed::{GroupListing, PostPage, ProfileListing},
    pagination::PageWindow,
    posts::{PostDetail, PostFormErrors},
};
use crate::application::error::{ErrorReport, HttpError};
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, PostRecord};
use crate::domain::viewer::Viewer;

pub const SITE_TITLE: &str = "Postboard";

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year] [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(nav: NavView) -> Response {
    let view = LayoutContext::new(nav, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Header navigation. The neutral variant is for pages rendered without a
/// session lookup, such as the fallback not-found page.
#[derive(Clone, Debug, Default)]
pub struct NavView {
    pub username: Option<String>,
    pub profile_href: String,
    pub neutral: bool,
}

impl NavView {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        Self {
            username: viewer.username().map(str::to_string),
            profile_href: viewer.username().map(profile_href).unwrap_or_default(),
            neutral: false,
        }
    }

    pub fn neutral() -> Self {
        Self {
            username: None,
            profile_href: String::new(),
            neutral: true,
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: &'static str,
    pub page_title: String,
    pub nav: NavView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(nav: NavView, page_title: impl Into<String>, content: T) -> Self {
        Self {
            site_title: SITE_TITLE,
            page_title: page_title.into(),
            nav,
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroupBadge {
    pub title: String,
    pub href: String,
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub id: String,
    pub text: String,
    pub author_username: String,
    pub author_href: String,
    pub published: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
    pub detail_href: String,
}

impl From<&PostEntry> for PostCard {
    fn from(entry: &PostEntry) -> Self {
        Self {
            id: entry.post.id.to_string(),
            text: entry.post.text.clone(),
            author_username: entry.author_username.clone(),
            author_href: profile_href(&entry.author_username),
            published: format_date(entry.post.created_at),
            group: entry.group.as_ref().map(|group| GroupBadge {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            image_url: entry.post.image_path.as_deref().map(media_url),
            detail_href: post_href(&entry.post.id.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub first_href: Option<String>,
    pub last_href: Option<String>,
}

impl PaginatorView {
    pub fn from_window<T>(window: &PageWindow<T>) -> Self {
        let href = |number: u64| format!("?page={number}");
        Self {
            number: window.number,
            num_pages: window.num_pages,
            previous_href: window.previous_page_number().map(href),
            next_href: window.next_page_number().map(href),
            first_href: (window.number > 2).then(|| href(1)),
            last_href: (window.number + 1 < window.num_pages).then(|| href(window.num_pages)),
        }
    }

    pub fn is_single(&self) -> bool {
        self.num_pages <= 1
    }
}

#[derive(Clone, Debug)]
pub struct ListingView {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub empty_message: &'static str,
}

impl ListingView {
    pub fn new(heading: impl Into<String>, page: &PostPage, empty_message: &'static str) -> Self {
        Self {
            heading: heading.into(),
            posts: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView::from_window(page),
            empty_message,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowFeedTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Clone, Debug)]
pub struct GroupView {
    pub title: String,
    pub description: Option<String>,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub empty_message: &'static str,
}

impl From<&GroupListing> for GroupView {
    fn from(listing: &GroupListing) -> Self {
        let ListingView {
            heading,
            posts,
            paginator,
            empty_message,
        } = ListingView::new(
            listing.group.title.clone(),
            &listing.page,
            "No posts in this group yet.",
        );
        Self {
            title: heading,
            description: listing.group.description.clone(),
            posts,
            paginator,
            empty_message,
        }
    }
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

#[derive(Clone, Debug)]
pub struct FollowControl {
    pub following: bool,
    pub href: String,
}

#[derive(Clone, Debug)]
pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub joined: String,
    pub follow: Option<FollowControl>,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
    pub empty_message: &'static str,
}

impl From<&ProfileListing> for ProfileView {
    fn from(profile: &ProfileListing) -> Self {
        let username = profile.author.username.clone();
        let follow = profile.following.map(|following| FollowControl {
            following,
            href: if following {
                format!("{}unfollow/", profile_href(&username))
            } else {
                format!("{}follow/", profile_href(&username))
            },
        });

        let listing = ListingView::new(
            format!("All posts by {username}"),
            &profile.page,
            "This author has not posted yet.",
        );
        Self {
            post_count: profile.post_count,
            joined: format_date(profile.author.created_at),
            follow,
            posts: listing.posts,
            paginator: listing.paginator,
            empty_message: listing.empty_message,
            username,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub created: String,
    pub text: String,
}

impl From<&CommentEntry> for CommentView {
    fn from(entry: &CommentEntry) -> Self {
        Self {
            author_username: entry.author_username.clone(),
            author_href: profile_href(&entry.author_username),
            created: format_datetime(entry.comment.created_at),
            text: entry.comment.text.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostDetailView {
    pub card: PostCard,
    pub author_post_count: u64,
    pub edit_href: Option<String>,
    pub comments: Vec<CommentView>,
    pub comment_action: String,
    pub can_comment: bool,
    pub login_href: String,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, viewer: &Viewer) -> Self {
        let card = PostCard::from(&detail.entry);
        let is_author = viewer.is(detail.entry.post.author_id);
        Self {
            edit_href: is_author.then(|| format!("{}edit/", card.detail_href)),
            comment_action: format!("{}comment/", card.detail_href),
            can_comment: viewer.is_authenticated(),
            login_href: login_href(&card.detail_href),
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            card,
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone, Debug)]
pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub no_group_selected: bool,
    pub current_image: Option<String>,
    pub errors: PostFormErrors,
}

impl PostFormView {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self::build(false, "/create/".to_string(), "", "", groups, None)
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        let selected = post.group_id.map(|id| id.to_string()).unwrap_or_default();
        Self::build(
            true,
            format!("{}edit/", post_href(&post.id.to_string())),
            &post.text,
            &selected,
            groups,
            post.image_path.as_deref(),
        )
    }

    /// Re-render a rejected submission with its values and field errors.
    pub fn rejected(
        mut self,
        text: &str,
        selected_group: &str,
        groups: &[GroupRecord],
        errors: PostFormErrors,
    ) -> Self {
        self.text = text.to_string();
        self.groups = group_options(groups, selected_group);
        self.no_group_selected = !self.groups.iter().any(|option| option.selected);
        self.errors = errors;
        self
    }

    fn build(
        is_edit: bool,
        action: String,
        text: &str,
        selected_group: &str,
        groups: &[GroupRecord],
        current_image: Option<&str>,
    ) -> Self {
        let groups = group_options(groups, selected_group);
        Self {
            is_edit,
            action,
            text: text.to_string(),
            no_group_selected: !groups.iter().any(|option| option.selected),
            groups,
            current_image: current_image.map(media_url),
            errors: PostFormErrors::default(),
        }
    }
}

fn group_options(groups: &[GroupRecord], selected: &str) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| {
            let id = group.id.to_string();
            GroupOption {
                selected: id == selected.trim(),
                id,
                title: group.title.clone(),
            }
        })
        .collect()
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Clone, Debug, Default)]
pub struct LoginView {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Clone, Debug, Default)]
pub struct SignupView {
    pub username: String,
    pub errors: SignupErrors,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

#[derive(Clone, Debug)]
pub struct ErrorPageView {
    pub status_code: u16,
    pub title: &'static str,
    pub message: &'static str,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status_code: StatusCode::NOT_FOUND.as_u16(),
            title: "Page not found",
            message: "The page you were looking for does not exist or has been removed.",
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{}/", encode_segment(username))
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn post_href(id: &str) -> String {
    format!("/posts/{id}/")
}

pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

/// `/auth/login/?next=<path>` with path separators left readable.
pub fn login_href(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={}", encoded.replace("%2F", "/"))
}

fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%2B")
}

fn format_date(value: OffsetDateTime) -> String {
    value
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

fn format_datetime(value: OffsetDateTime) -> String {
    value
        .format(DATETIME_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn login_href_keeps_slashes() {
        assert_eq!(login_href("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_href("/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn dates_use_long_month_names() {
        assert_eq!(format_date(datetime!(2026-03-07 10:15 UTC)), "7 March 2026");
        assert_eq!(
            format_datetime(datetime!(2026-03-07 09:05 UTC)),
            "7 March 2026 09:05"
        );
    }

    #[test]
    fn paginator_links_only_existing_pages() {
        let window = PageWindow::new(vec![1, 2, 3], 2, 2, 13);
        let view = PaginatorView::from_window(&window);
        assert_eq!(view.previous_href.as_deref(), Some("?page=1"));
        assert_eq!(view.next_href, None);
        assert_eq!(view.first_href, None);
        assert!(!view.is_single());
    }

    #[test]
    fn usernames_with_plus_are_escaped_in_paths() {
        assert_eq!(profile_href("a+b@c"), "/profile/a%2Bb%40c/");
    }
}

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};
use crate::domain::entities::{GroupRecord, UserRecord};

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

pub fn render_not_found_response() -> Response {
    let mut response = render_template_response(NotFoundTemplate {}, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub text: String,
    pub author_username: String,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub image_path: Option<String>,
    pub published: String,
}

#[derive(Clone)]
pub struct PaginationView {
    pub number: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_number: usize,
    pub next_number: usize,
}

/// One rendered page of a feed.
#[derive(Clone)]
pub struct FeedContext {
    pub posts: Vec<PostCard>,
    pub post_count: usize,
    pub total_count: usize,
    pub has_results: bool,
    pub pagination: PaginationView,
}

#[derive(Clone)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&GroupRecord> for GroupView {
    fn from(group: &GroupRecord) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthorView {
    pub username: String,
    pub total_posts: usize,
}

impl AuthorView {
    pub fn new(author: &UserRecord, total_posts: usize) -> Self {
        Self {
            username: author.username.clone(),
            total_posts,
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub published: String,
}

#[derive(Clone)]
pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

/// Context for the shared create/edit post form.
pub struct PostFormContext {
    pub action: String,
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: FeedContext,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupListTemplate {
    pub group: GroupView,
    pub page: FeedContext,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub author: AuthorView,
    /// None when the page is viewed anonymously or by the author.
    pub viewer_follows: Option<bool>,
    pub page: FeedContext,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub post: PostCard,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub comment_text: String,
    pub comment_error: Option<String>,
}

#[derive(Template)]
#[template(path = "create_edit_post.html")]
pub struct PostFormTemplate {
    pub form: PostFormContext,
}

#[derive(Template)]
#[template(path = "follow_index.html")]
pub struct FollowIndexTemplate {
    pub page: FeedContext,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {}

//! Read-only pages: feeds, post detail, profile, and stored media.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::feed::{self, FeedError};
use crate::application::posts::can_edit;
use crate::domain::entities::UserRecord;
use crate::infra::uploads::UploadStorageError;
use crate::presentation::views::{
    AuthorView, CommentView, GroupListTemplate, GroupView, IndexTemplate, PostDetailTemplate,
    ProfileTemplate, render_not_found_response, render_template_response,
};

use super::auth::current_user;
use super::{HttpState, PageQuery, internal_error};

use crate::application::pagination::PageNumber;

const SOURCE: &str = "infra::http::public";

pub(super) async fn index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = PageNumber::from_query(query.page.as_deref());
    match state.feed.index_page(page).await {
        Ok(context) => render_template_response(IndexTemplate { page: context }, StatusCode::OK),
        Err(err) => feed_error_response(err),
    }
}

pub(super) async fn group_list(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = PageNumber::from_query(query.page.as_deref());
    match state.feed.group_page(&slug, page).await {
        Ok(group_feed) => render_template_response(
            GroupListTemplate {
                group: GroupView::from(&group_feed.group),
                page: group_feed.context,
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
) -> Response {
    let page = PageNumber::from_query(query.page.as_deref());
    let profile_feed = match state.feed.profile_page(&username, page).await {
        Ok(profile_feed) => profile_feed,
        Err(err) => return feed_error_response(err),
    };

    let viewer = match current_user(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return err.into_response(),
    };

    // The follow control is only meaningful for a signed-in viewer looking
    // at someone else's profile.
    let viewer_follows = match viewer {
        Some(viewer) if viewer.id != profile_feed.author.id => {
            match state
                .follows
                .is_following(viewer.id, profile_feed.author.id)
                .await
            {
                Ok(follows) => Some(follows),
                Err(err) => return internal_error(SOURCE, &err),
            }
        }
        _ => None,
    };

    render_template_response(
        ProfileTemplate {
            author: AuthorView::new(&profile_feed.author, profile_feed.total_posts),
            viewer_follows,
            page: profile_feed.context,
        },
        StatusCode::OK,
    )
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response();
    };

    let viewer = match current_user(&state, &jar).await {
        Ok(viewer) => viewer,
        Err(err) => return err.into_response(),
    };

    detail_response(
        &state,
        post_id,
        viewer.as_ref(),
        String::new(),
        None,
        StatusCode::OK,
    )
    .await
}

/// Render the post detail page. Shared with the comment handler, which
/// re-renders it with the rejected input preserved.
pub(super) async fn detail_response(
    state: &HttpState,
    post_id: Uuid,
    viewer: Option<&UserRecord>,
    comment_text: String,
    comment_error: Option<String>,
    status: StatusCode,
) -> Response {
    let post = match state.posts.find(post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(),
        Err(err) => return internal_error(SOURCE, &err),
    };

    let author_username = match state.users.find_user(post.author_id).await {
        Ok(Some(author)) => author.username,
        Ok(None) => {
            return internal_error_message("Post author is missing");
        }
        Err(err) => return internal_error(SOURCE, &err),
    };

    let group = match post.group_id {
        Some(group_id) => match state.groups.find_group(group_id).await {
            Ok(Some(group)) => Some((group.title, group.slug)),
            Ok(None) => None,
            Err(err) => return internal_error(SOURCE, &err),
        },
        None => None,
    };

    let records = match state.comments.list(post_id).await {
        Ok(records) => records,
        Err(err) => return internal_error(SOURCE, &err),
    };

    let mut usernames: HashMap<Uuid, String> = HashMap::new();
    let mut comments = Vec::with_capacity(records.len());
    for record in &records {
        let author_username = match usernames.get(&record.author_id) {
            Some(name) => name.clone(),
            None => {
                let name = match state.users.find_user(record.author_id).await {
                    Ok(Some(user)) => user.username,
                    Ok(None) => "unknown".to_string(),
                    Err(err) => return internal_error(SOURCE, &err),
                };
                usernames.insert(record.author_id, name.clone());
                name
            }
        };
        comments.push(CommentView {
            author_username,
            text: record.text.clone(),
            published: feed::format_published(&record.created_at),
        });
    }

    let can_edit = viewer.map(|viewer| can_edit(viewer.id, &post)).unwrap_or(false);

    render_template_response(
        PostDetailTemplate {
            post: feed::post_card(&post, author_username, group),
            comments,
            can_edit,
            comment_text,
            comment_error,
        },
        status,
    )
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    match state.uploads.read(&path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CONTENT_LENGTH, data.len().to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(UploadStorageError::InvalidPath) => render_not_found_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            render_not_found_response()
        }
        Err(err) => {
            error!(target = "ritrovo::http::media", path = %path, error = %err, "media read failed");
            internal_error(SOURCE, &err)
        }
    }
}

pub(super) async fn not_found() -> Response {
    render_not_found_response()
}

fn feed_error_response(error: FeedError) -> Response {
    match error {
        FeedError::UnknownGroup | FeedError::UnknownAuthor => render_not_found_response(),
        FeedError::Repo(err) => internal_error(SOURCE, &err),
    }
}

fn internal_error_message(detail: &'static str) -> Response {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        detail,
    )
    .into_response()
}

//! Authenticated actions: post authoring, comments, and follow management.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::comments::CommentError;
use crate::application::error::HttpError;
use crate::application::follows::FollowError;
use crate::application::pagination::PageNumber;
use crate::application::posts::{PostError, PostInput};
use crate::presentation::views::{
    FollowIndexTemplate, GroupOption, PostFormContext, PostFormTemplate, render_not_found_response,
    render_template_response,
};

use super::auth::require_user;
use super::{HttpState, PageQuery, internal_error};

const SOURCE: &str = "infra::http::actions";

/// Parsed fields of the multipart post form.
#[derive(Debug, Default)]
struct PostForm {
    text: String,
    group_id: Option<Uuid>,
    image: Option<(String, bytes::Bytes)>,
}

/// Drain the multipart body into its known fields. Unknown fields are
/// ignored; an unparsable group id is a client error.
async fn read_post_form(multipart: &mut Multipart) -> Result<PostForm, Response> {
    let mut form = PostForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err(HttpError::from_error(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "Malformed form submission",
                    &err,
                )
                .into_response());
            }
        };

        match field.name() {
            Some("text") => {
                form.text = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                    .into_response()
                })?;
            }
            Some("group") => {
                let value = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                    .into_response()
                })?;
                let value = value.trim();
                if !value.is_empty() {
                    let group_id = Uuid::parse_str(value).map_err(|err| {
                        HttpError::from_error(
                            SOURCE,
                            StatusCode::BAD_REQUEST,
                            "Unrecognised group selection",
                            &err,
                        )
                        .into_response()
                    })?;
                    form.group_id = Some(group_id);
                }
            }
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                    .into_response()
                })?;
                // Browsers submit an empty file part when nothing was picked.
                if let Some(file_name) = file_name
                    && !data.is_empty()
                {
                    form.image = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Render the shared post form, optionally preserving rejected input.
async fn post_form_response(
    state: &HttpState,
    action: String,
    heading: &'static str,
    submit_label: &'static str,
    text: String,
    selected_group: Option<Uuid>,
    error: Option<String>,
    status: StatusCode,
) -> Response {
    let groups = match state.groups.list_groups().await {
        Ok(groups) => groups,
        Err(err) => return internal_error(SOURCE, &err),
    };

    let groups = groups
        .iter()
        .map(|group| GroupOption {
            id: group.id.to_string(),
            title: group.title.clone(),
            selected: selected_group == Some(group.id),
        })
        .collect();

    render_template_response(
        PostFormTemplate {
            form: PostFormContext {
                action,
                heading,
                submit_label,
                text,
                groups,
                error,
            },
        },
        status,
    )
}

pub(super) async fn post_create_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Err(response) = require_user(&state, &jar, "/posts/create").await {
        return response;
    }

    post_form_response(
        &state,
        "/posts/create".to_string(),
        "New post",
        "Publish",
        String::new(),
        None,
        None,
        StatusCode::OK,
    )
    .await
}

pub(super) async fn post_create(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let user = match require_user(&state, &jar, "/posts/create").await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let mut input = PostInput {
        text: form.text.clone(),
        group_id: form.group_id,
        image_path: None,
    };

    // A rejected submission stores no media.
    if let Err(err) = state.posts.check_create(&input).await {
        return create_failure_response(&state, &form, err).await;
    }

    input.image_path = match store_image(&state, form.image.take()).await {
        Ok(path) => path,
        Err(response) => return response,
    };

    match state.posts.create(user.id, input).await {
        Ok(_) => {
            state.invalidate_after_write();
            Redirect::to(&format!("/profiles/{}", user.username)).into_response()
        }
        Err(err) => create_failure_response(&state, &form, err).await,
    }
}

async fn create_failure_response(state: &HttpState, form: &PostForm, err: PostError) -> Response {
    match err {
        PostError::Validation { message } => {
            post_form_response(
                state,
                "/posts/create".to_string(),
                "New post",
                "Publish",
                form.text.clone(),
                form.group_id,
                Some(message),
                StatusCode::OK,
            )
            .await
        }
        PostError::UnknownGroup => {
            post_form_response(
                state,
                "/posts/create".to_string(),
                "New post",
                "Publish",
                form.text.clone(),
                form.group_id,
                Some("Selected group does not exist".to_string()),
                StatusCode::OK,
            )
            .await
        }
        err => internal_error(SOURCE, &err),
    }
}

pub(super) async fn post_edit_form(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response();
    };

    let user = match require_user(&state, &jar, &format!("/posts/{id}/edit")).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let post = match state.posts.find(post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(),
        Err(err) => return internal_error(SOURCE, &err),
    };

    // Non-authors are bounced to the detail page without fanfare.
    if !crate::application::posts::can_edit(user.id, &post) {
        return Redirect::to(&format!("/posts/{post_id}")).into_response();
    }

    post_form_response(
        &state,
        format!("/posts/{post_id}/edit"),
        "Edit post",
        "Save",
        post.text.clone(),
        post.group_id,
        None,
        StatusCode::OK,
    )
    .await
}

pub(super) async fn post_edit(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response();
    };

    let user = match require_user(&state, &jar, &format!("/posts/{id}/edit")).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let mut input = PostInput {
        text: form.text.clone(),
        group_id: form.group_id,
        image_path: None,
    };

    // A refused or rejected edit stores no media; stored image paths are
    // deterministic, so writing earlier would let a non-author replace the
    // bytes behind another post's image.
    if let Err(err) = state.posts.check_edit(user.id, post_id, &input).await {
        return edit_failure_response(&state, post_id, &form, err).await;
    }

    input.image_path = match store_image(&state, form.image.take()).await {
        Ok(path) => path,
        Err(response) => return response,
    };

    match state.posts.edit(user.id, post_id, input).await {
        Ok(_) => {
            state.invalidate_after_write();
            Redirect::to(&format!("/posts/{post_id}")).into_response()
        }
        Err(err) => edit_failure_response(&state, post_id, &form, err).await,
    }
}

async fn edit_failure_response(
    state: &HttpState,
    post_id: Uuid,
    form: &PostForm,
    err: PostError,
) -> Response {
    match err {
        PostError::Forbidden => Redirect::to(&format!("/posts/{post_id}")).into_response(),
        PostError::UnknownPost => render_not_found_response(),
        PostError::Validation { message } => {
            post_form_response(
                state,
                format!("/posts/{post_id}/edit"),
                "Edit post",
                "Save",
                form.text.clone(),
                form.group_id,
                Some(message),
                StatusCode::OK,
            )
            .await
        }
        PostError::UnknownGroup => {
            post_form_response(
                state,
                format!("/posts/{post_id}/edit"),
                "Edit post",
                "Save",
                form.text.clone(),
                form.group_id,
                Some("Selected group does not exist".to_string()),
                StatusCode::OK,
            )
            .await
        }
        err => internal_error(SOURCE, &err),
    }
}

async fn store_image(
    state: &HttpState,
    image: Option<(String, bytes::Bytes)>,
) -> Result<Option<String>, Response> {
    let Some((file_name, data)) = image else {
        return Ok(None);
    };

    match state.uploads.store(&file_name, data).await {
        Ok(stored) => Ok(Some(stored.stored_path)),
        Err(err) => Err(internal_error(SOURCE, &err)),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CommentForm {
    #[serde(default)]
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
    axum::Form(form): axum::Form<CommentForm>,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response();
    };

    let user = match require_user(&state, &jar, &format!("/posts/{id}")).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.comments.add(user.id, post_id, form.text.clone()).await {
        Ok(_) => Redirect::to(&format!("/posts/{post_id}")).into_response(),
        Err(CommentError::UnknownPost) => render_not_found_response(),
        Err(CommentError::Validation { message }) => {
            super::public::detail_response(
                &state,
                post_id,
                Some(&user),
                form.text,
                Some(message),
                StatusCode::OK,
            )
            .await
        }
        Err(err) => internal_error(SOURCE, &err),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Response {
    let user = match require_user(&state, &jar, &format!("/profiles/{username}")).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.follows.follow(user.id, &username).await {
        Ok(author) => Redirect::to(&format!("/profiles/{}", author.username)).into_response(),
        Err(FollowError::UnknownAuthor) => render_not_found_response(),
        Err(err) => internal_error(SOURCE, &err),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Response {
    let user = match require_user(&state, &jar, &format!("/profiles/{username}")).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.follows.unfollow(user.id, &username).await {
        Ok(author) => Redirect::to(&format!("/profiles/{}", author.username)).into_response(),
        Err(FollowError::UnknownAuthor) => render_not_found_response(),
        Err(err) => internal_error(SOURCE, &err),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
) -> Response {
    let user = match require_user(&state, &jar, "/follow").await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let page = PageNumber::from_query(query.page.as_deref());
    match state.feed.follow_page(user.id, page).await {
        Ok(context) => {
            render_template_response(FollowIndexTemplate { page: context }, StatusCode::OK)
        }
        Err(err) => internal_error(SOURCE, &err),
    }
}

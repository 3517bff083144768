//! HTTP surface: router assembly, handlers, and session plumbing.

mod actions;
mod auth;
mod middleware;
mod public;

pub use auth::{SESSION_COOKIE, SessionStore};

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    application::{
        comments::CommentService,
        error::HttpError,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{GroupsRepo, UsersRepo},
    },
    cache::{CacheState, page_cache_layer},
    infra::uploads::UploadStorage,
};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<dyn UsersRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub sessions: Arc<SessionStore>,
    pub uploads: Arc<UploadStorage>,
    pub cache: Option<CacheState>,
}

impl HttpState {
    /// Clear cached pages after a feed-changing write, when configured to.
    fn invalidate_after_write(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_after_write();
        }
    }
}

/// `?page=` query accepted by every paginated feed route.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub fn build_router(state: HttpState, upload_body_limit: usize) -> Router {
    // Only the plain index page is served from the response cache.
    let cached_routes = Router::new().route("/", get(public::index));

    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(axum_middleware::from_fn_with_state(
            cache_state,
            page_cache_layer,
        ))
    } else {
        cached_routes
    };

    let routes = Router::new()
        .route("/groups/{slug}", get(public::group_list))
        .route("/profiles/{username}", get(public::profile))
        .route(
            "/posts/create",
            get(actions::post_create_form).post(actions::post_create),
        )
        .route("/posts/{id}", get(public::post_detail))
        .route(
            "/posts/{id}/edit",
            get(actions::post_edit_form).post(actions::post_edit),
        )
        .route("/posts/{id}/comment", post(actions::add_comment))
        .route("/profiles/{username}/follow", post(actions::profile_follow))
        .route(
            "/profiles/{username}/unfollow",
            post(actions::profile_unfollow),
        )
        .route("/follow", get(actions::follow_index))
        .route(
            "/auth/login",
            get(auth::login_form).post(auth::login_submit),
        )
        .route("/auth/logout", post(auth::logout))
        .route("/media/{*path}", get(public::serve_media))
        .fallback(public::not_found);

    cached_routes
        .merge(routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

pub(crate) fn internal_error(source: &'static str, error: &dyn StdError) -> Response {
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        error,
    )
    .into_response()
}

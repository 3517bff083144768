//! Cookie sessions backed by an in-process token store.
//!
//! Login is username-only by design: the service trusts its deployment
//! perimeter and the interesting policy lives in what a session may do, not
//! in how it is minted.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use url::form_urlencoded::Serializer;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::UserRecord;
use crate::presentation::views::{LoginTemplate, render_template_response};

use super::HttpState;

pub const SESSION_COOKIE: &str = "ritrovo_session";

const SOURCE: &str = "infra::http::auth";

/// In-process session tokens mapped to user ids.
pub struct SessionStore {
    tokens: RwLock<HashMap<String, Uuid>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh token for the user.
    pub fn open(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().to_string();
        rw_write(&self.tokens, SOURCE, "open").insert(token.clone(), user_id);
        token
    }

    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        rw_read(&self.tokens, SOURCE, "resolve").get(token).copied()
    }

    pub fn close(&self, token: &str) {
        rw_write(&self.tokens, SOURCE, "close").remove(token);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the viewer behind the request cookie, if any.
pub(super) async fn current_user(
    state: &HttpState,
    jar: &CookieJar,
) -> Result<Option<UserRecord>, HttpError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.resolve(cookie.value()) else {
        return Ok(None);
    };

    state.users.find_user(user_id).await.map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
    })
}

/// Redirect an anonymous request to the login form, preserving the
/// destination.
pub(super) fn login_redirect(next: &str) -> Response {
    let query = Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    Redirect::to(&format!("/auth/login?{query}")).into_response()
}

/// Resolve the viewer or fail with a ready-to-return response. Gated
/// handlers bail out with the login redirect before touching any state.
pub(super) async fn require_user(
    state: &HttpState,
    jar: &CookieJar,
    next: &str,
) -> Result<UserRecord, Response> {
    match current_user(state, jar).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(login_redirect(next)),
        Err(err) => Err(err.into_response()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginForm {
    username: String,
    #[serde(default)]
    next: Option<String>,
}

pub(super) async fn login_form(Query(query): Query<LoginQuery>) -> Response {
    render_template_response(
        LoginTemplate {
            next: sanitize_next(query.next),
            error: None,
        },
        StatusCode::OK,
    )
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    let next = sanitize_next(form.next);

    match state.users.find_user_by_username(form.username.trim()).await {
        Ok(Some(user)) => {
            let token = state.sessions.open(user.id);
            let cookie = Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true);
            (jar.add(cookie), Redirect::to(&next)).into_response()
        }
        Ok(None) => render_template_response(
            LoginTemplate {
                next,
                error: Some("Unknown username".to_string()),
            },
            StatusCode::OK,
        ),
        Err(err) => super::internal_error(SOURCE, &err),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.close(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/")).into_response()
}

/// Only same-site paths are honoured as post-login destinations.
fn sanitize_next(next: Option<String>) -> String {
    next.filter(|value| value.starts_with('/') && !value.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

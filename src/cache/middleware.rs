//! Response cache middleware for the index feed.
//!
//! Serves GET `/` from the `index_page` slot while it is valid; a miss runs
//! the handler and stores successful responses for the configured TTL.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument};

use super::{
    CacheConfig,
    store::{CachedPage, INDEX_PAGE_KEY, PageCache},
};

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Shared cache state for middleware and write handlers.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<PageCache>,
}

impl CacheState {
    /// Drop cached pages after a feed-changing write, when configured to.
    pub fn invalidate_after_write(&self) {
        if self.config.invalidate_on_write {
            self.store.clear();
            counter!("ritrovo_page_cache_clear_total").increment(1);
        }
    }
}

/// Middleware caching the rendered index page.
///
/// Only plain GET requests without a query string are served from or stored
/// into the slot, so paginated views never alias the front page.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.is_enabled() {
        return next.run(request).await;
    }

    if request.method() != Method::GET || request.uri().query().is_some() {
        return next.run(request).await;
    }

    if let Some(cached) = cache.store.get(INDEX_PAGE_KEY) {
        counter!("ritrovo_page_cache_hit_total").increment(1);
        debug!(outcome = "hit", "serving cached index page");
        return build_response(cached);
    }

    counter!("ritrovo_page_cache_miss_total").increment(1);
    debug!(outcome = "miss", "cache miss, executing handler");

    let response = next.run(request).await;

    if response.status() == StatusCode::OK {
        let (parts, body) = response.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(_) => {
                // The failed read consumed the body; nothing valid is left
                // to forward.
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if bytes.len() <= MAX_CACHED_BODY_BYTES {
            let cached = CachedPage {
                status: parts.status.as_u16(),
                headers: parts
                    .headers
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|text| (name.to_string(), text.to_string()))
                    })
                    .collect(),
                body: bytes.clone(),
            };

            cache.store.set(INDEX_PAGE_KEY, cached, cache.config.ttl());
            counter!("ritrovo_page_cache_store_total").increment(1);
        } else {
            debug!(
                outcome = "skip",
                size = bytes.len(),
                "page exceeds the cacheable size, serving uncached"
            );
        }

        Response::from_parts(parts, Body::from(bytes))
    } else {
        response
    }
}

/// Rebuild a response from cached data.
fn build_response(cached: CachedPage) -> Response {
    use axum::http::HeaderValue;

    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

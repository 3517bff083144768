mod support;

use std::time::Duration;

use axum::http::StatusCode;
use ritrovo::cache::CacheConfig;

use support::{MultipartForm, TestApp, assert_status, body_string};

fn cache_config(ttl_seconds: u64, invalidate_on_write: bool) -> CacheConfig {
    CacheConfig {
        enabled: true,
        ttl_seconds,
        invalidate_on_write,
    }
}

#[tokio::test]
async fn front_page_serves_cached_snapshot_until_cleared() {
    let app = TestApp::with_cache(cache_config(20, false));
    let leo = app.repos.seed_user("leo");
    app.repos.seed_post(&leo, None, "Cached content");

    let first = body_string(app.get("/").await).await;
    assert!(first.contains("Cached content"));

    // The new post exists in storage but the cached snapshot hides it.
    app.repos.seed_post(&leo, None, "Fresh content");
    let second = body_string(app.get("/").await).await;
    assert!(second.contains("Cached content"));
    assert!(!second.contains("Fresh content"));

    // Clearing the slot makes the next render see current data.
    app.cache.as_ref().expect("cache store").clear();
    let third = body_string(app.get("/").await).await;
    assert!(third.contains("Fresh content"));
}

#[tokio::test]
async fn cached_snapshot_expires_after_ttl() {
    let app = TestApp::with_cache(cache_config(1, false));
    let leo = app.repos.seed_user("leo");
    app.repos.seed_post(&leo, None, "Old news");

    let first = body_string(app.get("/").await).await;
    assert!(first.contains("Old news"));

    app.repos.seed_post(&leo, None, "Breaking news");
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let second = body_string(app.get("/").await).await;
    assert!(second.contains("Breaking news"));
}

#[tokio::test]
async fn paginated_requests_bypass_the_cache() {
    let app = TestApp::with_cache(cache_config(20, false));
    let leo = app.repos.seed_user("leo");
    for index in 1..=13 {
        app.repos.seed_post(&leo, None, &format!("Post number {index:02}"));
    }

    // Warm the front-page slot.
    app.get("/").await;

    app.repos.seed_post(&leo, None, "Post number 14");

    // `?page=` views are never served from the slot, so they see the new post
    // shift the pages while the plain front page stays frozen.
    let second_page = body_string(app.get("/?page=2").await).await;
    assert!(second_page.contains("Post number 04"));

    let front = body_string(app.get("/").await).await;
    assert!(!front.contains("Post number 14"));
}

#[tokio::test]
async fn write_invalidation_refreshes_the_front_page() {
    let app = TestApp::with_cache(cache_config(20, true));
    let leo = app.repos.seed_user("leo");
    app.repos.seed_post(&leo, None, "Before the write");
    let cookie = app.session_for(&leo);

    let first = body_string(app.get("/").await).await;
    assert!(first.contains("Before the write"));

    let (body, boundary) = MultipartForm::new().text("text", "After the write").finish();
    let response = app
        .post_multipart("/posts/create", Some(&cookie), body, &boundary)
        .await;
    assert_status(&response, StatusCode::SEE_OTHER);

    let second = body_string(app.get("/").await).await;
    assert!(second.contains("After the write"));
}

#[tokio::test]
async fn disabled_cache_always_renders_fresh() {
    let app = TestApp::new();
    let leo = app.repos.seed_user("leo");
    app.repos.seed_post(&leo, None, "First render");

    let first = body_string(app.get("/").await).await;
    assert!(first.contains("First render"));

    app.repos.seed_post(&leo, None, "Second render");
    let second = body_string(app.get("/").await).await;
    assert!(second.contains("Second render"));
}

#[tokio::test]
async fn oversized_front_page_is_served_fresh_every_time() {
    let app = TestApp::with_cache(cache_config(20, false));
    let leo = app.repos.seed_user("leo");
    // A single long post pushes the rendered page past the cacheable size.
    app.repos.seed_post(&leo, None, &"long ".repeat(300_000));

    let first = app.get("/").await;
    assert_status(&first, StatusCode::OK);
    assert!(app.cache.as_ref().expect("cache store").is_empty());

    app.repos.seed_post(&leo, None, "Still visible");
    let second = body_string(app.get("/").await).await;
    assert!(second.contains("Still visible"));
}

//! Page cache: a small set of named TTL slots holding rendered responses.

pub mod config;
pub(crate) mod lock;
pub mod middleware;
pub mod store;

pub use config::CacheConfig;
pub use middleware::{CacheState, page_cache_layer};
pub use store::{CachedPage, INDEX_PAGE_KEY, PageCache};

//! TTL slot storage for rendered responses.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Slot key for the rendered index page.
pub const INDEX_PAGE_KEY: &str = "index_page";

/// A cached HTTP response.
#[derive(Clone)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Slot {
    page: CachedPage,
    expires_at: Instant,
}

/// Named TTL slots holding rendered pages.
///
/// A slot is either empty or holds one page until its deadline passes or the
/// whole cache is cleared. Writers race last-wins; no stronger guarantee.
pub struct PageCache {
    slots: RwLock<HashMap<String, Slot>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the slot contents. Expired entries count as misses and are
    /// dropped on the way out.
    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let mut slots = rw_write(&self.slots, SOURCE, "get");
        match slots.get(key) {
            Some(slot) if slot.expires_at > Instant::now() => Some(slot.page.clone()),
            Some(_) => {
                slots.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a page, resetting the slot deadline to now + ttl.
    pub fn set(&self, key: &str, page: CachedPage, ttl: Duration) {
        let slot = Slot {
            page,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.slots, SOURCE, "set").insert(key.to_string(), slot);
    }

    /// Empty every slot.
    pub fn clear(&self) {
        rw_write(&self.slots, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.slots, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}

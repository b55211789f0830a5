use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use registry::{
    catalog::effective_search,
    models::{CatalogPage, Category},
};

pub const STALE_AFTER: Duration = Duration::from_secs(5 * 60);
pub const EVICT_AFTER: Duration = Duration::from_secs(10 * 60);

/// Cache key for a catalog listing. The search term is stored already reduced
/// to its effective form, so `" a "` and no search share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub category: Category,
    pub search: Option<String>,
}

impl FeedKey {
    pub fn new(category: Category, search: Option<&str>) -> Self {
        Self {
            category,
            search: effective_search(search),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Still served, but due for a background refetch.
    Stale,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    pages: Vec<CatalogPage>,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct PageCache {
    stale_after: Duration,
    evict_after: Duration,
    entries: HashMap<FeedKey, CacheEntry>,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(STALE_AFTER, EVICT_AFTER)
    }
}

impl PageCache {
    pub fn new(stale_after: Duration, evict_after: Duration) -> Self {
        Self {
            stale_after,
            evict_after,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &FeedKey, now: Instant) -> Option<(Vec<CatalogPage>, Freshness)> {
        self.evict(now);

        self.entries.get(key).map(|entry| {
            let freshness = if now.saturating_duration_since(entry.fetched_at) >= self.stale_after {
                Freshness::Stale
            } else {
                Freshness::Fresh
            };

            (entry.pages.clone(), freshness)
        })
    }

    /// Stores `page` at its own index. Pages arrive in order, so anything at or
    /// past that index is replaced.
    pub fn put(&mut self, key: FeedKey, page: CatalogPage, now: Instant) {
        self.evict(now);

        let entry = self.entries.entry(key).or_insert_with(|| CacheEntry {
            pages: Vec::new(),
            fetched_at: now,
        });
        entry.pages.truncate(page.page);
        entry.pages.push(page);
        entry.fetched_at = now;
    }

    pub fn invalidate(&mut self, key: &FeedKey) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&mut self, now: Instant) {
        let evict_after = self.evict_after;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < evict_after);
    }
}

//! # Product Feed
//!
//! Caller side of the catalog pagination contract.
//!
//! - One page in flight at a time, requested in increasing order
//! - Pages land in a [`PageCache`] keyed by `(category, search)`
//! - Changing the key bumps a generation; responses for an older generation are dropped
//! - A failed page keeps everything already loaded and records the error
//!
//! Driving loop:
//! ```ignore
//! feed.set_query(Category::Drug, Some("aspirin"), Instant::now());
//! while feed.has_next_page() {
//!     load_next(&mut feed, &registry).await;
//! }
//! ```
use std::time::Instant;

use registry::{
    catalog::fetch_page,
    error::FetchError,
    models::{CatalogPage, Category, ProductRecord},
    source::ProductSource,
};
use tracing::{debug, warn};

use crate::cache::{FeedKey, Freshness, PageCache};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: FeedKey,
    pub page: usize,
    generation: u64,
}

#[derive(Debug)]
pub enum Completion {
    Applied,
    /// The key changed while the page was in flight.
    Discarded,
    Failed(FetchError),
}

#[derive(Debug)]
pub struct ProductFeed {
    key: FeedKey,
    generation: u64,
    pages: Vec<CatalogPage>,
    in_flight: Option<PageRequest>,
    needs_refresh: bool,
    last_error: Option<String>,
    cache: PageCache,
}

impl ProductFeed {
    pub fn new(category: Category, search: Option<&str>) -> Self {
        Self::with_cache(category, search, PageCache::default())
    }

    pub fn with_cache(category: Category, search: Option<&str>, cache: PageCache) -> Self {
        Self {
            key: FeedKey::new(category, search),
            generation: 0,
            pages: Vec::new(),
            in_flight: None,
            needs_refresh: false,
            last_error: None,
            cache,
        }
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    /// Switches to another listing. Cached pages are restored immediately;
    /// returns whether the effective key changed.
    pub fn set_query(&mut self, category: Category, search: Option<&str>, now: Instant) -> bool {
        let key = FeedKey::new(category, search);
        if key == self.key {
            return false;
        }

        debug!(?key, "Feed key changed");

        self.generation += 1;
        self.in_flight = None;
        self.last_error = None;
        self.key = key;

        match self.cache.get(&self.key, now) {
            Some((pages, freshness)) => {
                self.pages = pages;
                self.needs_refresh = freshness == Freshness::Stale;
            }
            None => {
                self.pages = Vec::new();
                self.needs_refresh = false;
            }
        }

        true
    }

    /// Drops the cached pages for the current key and starts over from page 0.
    pub fn refresh(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.last_error = None;
        self.pages.clear();
        self.needs_refresh = false;
        self.cache.invalidate(&self.key);
    }

    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.pages.iter().flat_map(|page| page.records.iter())
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_count(&self) -> Option<usize> {
        self.pages.last().map(|page| page.total_count)
    }

    /// True before the first page has loaded.
    pub fn has_next_page(&self) -> bool {
        self.pages.last().is_none_or(|page| page.has_more)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some() && self.pages.is_empty()
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.in_flight.is_some() && !self.pages.is_empty()
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Next page to fetch, or `None` while one is in flight or nothing is left.
    pub fn begin_next(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || !self.has_next_page() {
            return None;
        }

        let request = PageRequest {
            key: self.key.clone(),
            page: self.pages.len(),
            generation: self.generation,
        };
        self.in_flight = Some(request.clone());

        Some(request)
    }

    pub fn complete(
        &mut self,
        request: PageRequest,
        result: Result<CatalogPage, FetchError>,
        now: Instant,
    ) -> Completion {
        if request.generation != self.generation || self.in_flight.as_ref() != Some(&request) {
            debug!(page = request.page, "Discarding page for stale key");
            return Completion::Discarded;
        }

        self.in_flight = None;

        match result {
            Ok(page) => {
                self.last_error = None;
                self.cache.put(self.key.clone(), page.clone(), now);
                self.pages.push(page);

                Completion::Applied
            }
            Err(e) => {
                warn!(page = request.page, error = %e, "Page fetch failed");
                self.last_error = Some(e.to_string());

                Completion::Failed(e)
            }
        }
    }
}

/// Fetches the next page, if any, and applies it.
pub async fn load_next<S: ProductSource>(feed: &mut ProductFeed, source: &S) -> Option<Completion> {
    let request = feed.begin_next()?;
    let result = fetch_page(
        source,
        request.key.category,
        request.key.search.as_deref(),
        request.page,
    )
    .await;

    Some(feed.complete(request, result, Instant::now()))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::Duration};

    use registry::{
        memory::{Failure, Fixture, MemorySource},
        models::{DrugRow, FoodRow},
    };

    use super::*;

    fn source() -> MemorySource {
        MemorySource::new(Fixture {
            food: (0..50)
                .map(|i| FoodRow {
                    registration_number: format!("FR-{i:04}"),
                    brand_name: Some(format!("Noodles {i:02}")),
                    ..Default::default()
                })
                .collect(),
            drug: (0..25)
                .map(|i| DrugRow {
                    registration_number: format!("DR-{i:04}"),
                    generic_name: Some(format!("Aspirin {i:02}")),
                    ..Default::default()
                })
                .collect(),
        })
    }

    #[tokio::test]
    async fn test_loads_every_page_once() {
        let source = source();
        let mut feed = ProductFeed::new(Category::All, None);

        while feed.has_next_page() {
            assert!(matches!(load_next(&mut feed, &source).await, Some(Completion::Applied)));
        }

        assert_eq!(feed.len(), 75);
        assert_eq!(feed.total_count(), Some(75));
        let unique: HashSet<_> = feed.records().map(|r| r.identifier.clone()).collect();
        assert_eq!(unique.len(), 75);
        assert!(load_next(&mut feed, &source).await.is_none());
    }

    #[test]
    fn test_one_request_in_flight() {
        let mut feed = ProductFeed::new(Category::All, None);

        let first = feed.begin_next().unwrap();
        assert_eq!(first.page, 0);
        assert!(feed.is_loading());
        assert!(feed.begin_next().is_none());
    }

    #[test]
    fn test_stale_key_discarded() {
        let now = Instant::now();
        let mut feed = ProductFeed::new(Category::All, None);
        let request = feed.begin_next().unwrap();

        assert!(feed.set_query(Category::Drug, Some("aspirin"), now));

        let page = CatalogPage {
            page: 0,
            records: Vec::new(),
            total_count: 75,
            has_more: true,
        };
        assert!(matches!(feed.complete(request, Ok(page), now), Completion::Discarded));
        assert!(feed.is_empty());
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_same_effective_key_keeps_state() {
        let mut feed = ProductFeed::new(Category::Food, None);
        let request = feed.begin_next().unwrap();

        assert!(!feed.set_query(Category::Food, Some("x"), Instant::now()));
        assert_eq!(feed.in_flight, Some(request));
    }

    #[tokio::test]
    async fn test_failure_keeps_loaded_pages() {
        let source = source();
        let mut feed = ProductFeed::new(Category::All, None);

        load_next(&mut feed, &source).await;
        source.fail(Failure::Page);

        let completion = load_next(&mut feed, &source).await;
        assert!(matches!(completion, Some(Completion::Failed(_))));
        assert_eq!(feed.len(), 30);
        assert!(feed.last_error().is_some());

        source.recover(Failure::Page);
        assert!(matches!(load_next(&mut feed, &source).await, Some(Completion::Applied)));
        assert_eq!(feed.len(), 60);
        assert!(feed.last_error().is_none());
    }

    #[tokio::test]
    async fn test_refresh_clears_error() {
        let source = source();
        let mut feed = ProductFeed::new(Category::All, None);

        source.fail(Failure::Page);
        load_next(&mut feed, &source).await;
        assert!(feed.last_error().is_some());

        feed.refresh();
        assert!(feed.last_error().is_none());
        assert!(feed.has_next_page());
    }

    #[tokio::test]
    async fn test_cached_pages_restored() {
        let source = source();
        let mut feed = ProductFeed::new(Category::Drug, None);

        load_next(&mut feed, &source).await;
        assert_eq!(feed.len(), 25);

        let now = Instant::now();
        feed.set_query(Category::Food, None, now);
        assert!(feed.is_empty());

        feed.set_query(Category::Drug, None, now);
        assert_eq!(feed.len(), 25);
        assert!(!feed.needs_refresh());

        feed.set_query(Category::Food, None, now);
        feed.set_query(Category::Drug, None, now + Duration::from_secs(6 * 60));
        assert_eq!(feed.len(), 25);
        assert!(feed.needs_refresh());

        feed.refresh();
        assert!(feed.is_empty());
        assert!(feed.has_next_page());
    }
}

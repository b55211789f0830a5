//! # Registry
//!
//! Query layer over the national product registration database.
//!
//! Two tables hold registrations: food (which also carries cosmetics) and
//! drugs. They disagree on column names, so rows are normalized into one
//! [`ProductRecord`](models::ProductRecord) shape before leaving this crate.
//! A third, unified view backs catalog browsing.
//!
//! - [`resolve::verify`] answers "is this product registered?"
//! - [`catalog::fetch_page`] serves the browsable catalog 30 rows at a time
//!
//! Both work against any [`ProductSource`]. [`Registry`] picks between the
//! hosted database and a local JSON fixture.
use std::path::Path;

use tracing::info;

pub mod catalog;
pub mod error;
pub mod memory;
pub mod models;
pub mod normalize;
pub mod postgrest;
pub mod resolve;
pub mod source;
pub mod utils;

use error::SourceError;
use memory::MemorySource;
use models::{RawRow, SourceKind};
use postgrest::PostgrestSource;
use source::{PageQuery, Paged, ProductSource, SearchMode};

pub enum Registry {
    Remote(PostgrestSource),
    Memory(MemorySource),
}

impl Registry {
    pub fn remote(url: &str, api_key: &str) -> Result<Self, SourceError> {
        info!("Using hosted registry at {url}");

        Ok(Registry::Remote(PostgrestSource::new(url, api_key)?))
    }

    pub fn fixture(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        info!("Using fixture registry from {}", path.as_ref().display());

        Ok(Registry::Memory(MemorySource::load(path)?))
    }
}

impl ProductSource for Registry {
    async fn exact(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> Result<Option<RawRow>, SourceError> {
        match self {
            Registry::Remote(source) => source.exact(kind, identifier).await,
            Registry::Memory(source) => source.exact(kind, identifier).await,
        }
    }

    async fn search(
        &self,
        kind: SourceKind,
        term: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RawRow>, SourceError> {
        match self {
            Registry::Remote(source) => source.search(kind, term, mode, limit).await,
            Registry::Memory(source) => source.search(kind, term, mode, limit).await,
        }
    }

    async fn page(&self, query: &PageQuery) -> Result<Paged, SourceError> {
        match self {
            Registry::Remote(source) => source.page(query).await,
            Registry::Memory(source) => source.page(query).await,
        }
    }
}

use std::future::Future;

use crate::{
    error::SourceError,
    models::{CatalogRow, Category, RawRow, SourceKind},
};

/// Text-search syntax handed to the backend's full-text filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Websearch syntax, ranked. Rejects some malformed input.
    WebSearch,
    /// Plain-text syntax, more permissive.
    Plain,
}

impl SearchMode {
    pub fn operator(self) -> &'static str {
        match self {
            SearchMode::WebSearch => "wfts",
            SearchMode::Plain => "plfts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub category: Category,
    pub search: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paged {
    pub rows: Vec<CatalogRow>,
    pub total: usize,
}

/// Query surface of the hosted product database.
pub trait ProductSource {
    /// Equality match on the registration number, at most one row.
    fn exact(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<RawRow>, SourceError>> + Send;

    /// Ranked full-text match against the source's search vector.
    fn search(
        &self,
        kind: SourceKind,
        term: &str,
        mode: SearchMode,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RawRow>, SourceError>> + Send;

    /// One slice of the unified view, ordered by display name, with an exact count.
    fn page(&self, query: &PageQuery) -> impl Future<Output = Result<Paged, SourceError>> + Send;
}

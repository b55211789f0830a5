//! In-memory product source.
//!
//! Serves a JSON fixture (`{ "food": [...], "drug": [...] }`) with the same
//! query semantics as the hosted database, closely enough for local runs and
//! tests. Every call is recorded, and individual lookups can be made to fail.
use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::SourceError,
    models::{CatalogRow, DrugRow, FoodRow, ProductRecord, RawRow, SourceKind},
    normalize,
    source::{PageQuery, Paged, ProductSource, SearchMode},
    utils::tokens,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub food: Vec<FoodRow>,
    #[serde(default)]
    pub drug: Vec<DrugRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exact(SourceKind, String),
    Search(SourceKind, String, SearchMode),
    Page(PageQuery),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    Exact(SourceKind),
    Search(SourceKind, SearchMode),
    Page,
}

#[derive(Debug, Default)]
pub struct MemorySource {
    fixture: Fixture,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<Failure>>,
}

impl MemorySource {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            ..Default::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| SourceError::Fixture(format!("{}: {e}", path.display())))?;
        let fixture = serde_json::from_str(&data)
            .map_err(|e| SourceError::Fixture(format!("{}: {e}", path.display())))?;

        Ok(Self::new(fixture))
    }

    pub fn fail(&self, failure: Failure) {
        lock(&self.failures).insert(failure);
    }

    pub fn recover(&self, failure: Failure) {
        lock(&self.failures).remove(&failure);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn check(&self, failure: Failure) -> Result<(), SourceError> {
        if lock(&self.failures).contains(&failure) {
            return Err(SourceError::Fixture(format!("injected failure: {failure:?}")));
        }

        Ok(())
    }

    fn rows(&self, kind: SourceKind) -> Vec<RawRow> {
        match kind {
            SourceKind::Food => self.fixture.food.iter().cloned().map(RawRow::Food).collect(),
            SourceKind::Drug => self.fixture.drug.iter().cloned().map(RawRow::Drug).collect(),
        }
    }

    fn catalog(&self) -> Vec<ProductRecord> {
        let mut records: Vec<ProductRecord> = self
            .rows(SourceKind::Food)
            .into_iter()
            .chain(self.rows(SourceKind::Drug))
            .map(normalize::record)
            .collect();

        records.sort_by(|a, b| {
            a.catalog_order(b)
                .then_with(|| a.source_kind.cmp(&b.source_kind))
        });

        records
    }
}

impl ProductSource for MemorySource {
    async fn exact(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> Result<Option<RawRow>, SourceError> {
        self.record(Call::Exact(kind, identifier.to_string()));
        self.check(Failure::Exact(kind))?;

        Ok(self
            .rows(kind)
            .into_iter()
            .find(|row| row.registration_number() == identifier))
    }

    async fn search(
        &self,
        kind: SourceKind,
        term: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RawRow>, SourceError> {
        self.record(Call::Search(kind, term.to_string(), mode));
        self.check(Failure::Search(kind, mode))?;

        let query = tokens(term);

        Ok(self
            .rows(kind)
            .into_iter()
            .filter(|row| matches(&query, &raw_text(row)))
            .take(limit)
            .collect())
    }

    async fn page(&self, query: &PageQuery) -> Result<Paged, SourceError> {
        self.record(Call::Page(query.clone()));
        self.check(Failure::Page)?;

        let search = query.search.as_deref().map(tokens);
        let filtered: Vec<ProductRecord> = self
            .catalog()
            .into_iter()
            .filter(|record| {
                query
                    .category
                    .catalog_value()
                    .is_none_or(|category| record.category.eq_ignore_ascii_case(category))
            })
            .filter(|record| {
                search
                    .as_ref()
                    .is_none_or(|terms| matches(terms, &record_text(record)))
            })
            .collect();

        let total = filtered.len();
        let rows = filtered
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(CatalogRow::from)
            .collect();

        Ok(Paged { rows, total })
    }
}

impl From<ProductRecord> for CatalogRow {
    fn from(record: ProductRecord) -> Self {
        CatalogRow {
            registration_number: record.identifier,
            display_name: Some(record.display_name),
            manufacturer: Some(record.manufacturer),
            category: Some(record.category),
            source_kind: record.source_kind,
            issuance_date: record.issuance_date,
            expiry_date: record.expiry_date,
        }
    }
}

/// The guarded data is a log and a set of switches, both valid after a panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Every query token must prefix some candidate token.
fn matches(query: &[String], candidate: &[String]) -> bool {
    !query.is_empty()
        && query
            .iter()
            .all(|q| candidate.iter().any(|c| c.starts_with(q.as_str())))
}

fn raw_text(row: &RawRow) -> Vec<String> {
    let text = match row {
        RawRow::Food(r) => [
            Some(&r.registration_number),
            r.product_name.as_ref(),
            r.brand_name.as_ref(),
            r.company_name.as_ref(),
        ],
        RawRow::Drug(r) => [
            Some(&r.registration_number),
            r.generic_name.as_ref(),
            r.brand_name.as_ref(),
            r.manufacturer.as_ref(),
        ],
    };

    text.into_iter().flatten().flat_map(|s| tokens(s)).collect()
}

fn record_text(record: &ProductRecord) -> Vec<String> {
    [&record.identifier, &record.display_name, &record.manufacturer]
        .into_iter()
        .flat_map(|s| tokens(s))
        .collect()
}

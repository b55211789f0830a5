//! # Verification
//!
//! Resolves a user query into a [`VerificationResult`].
//!
//! ## Lookups
//! - Each selected source gets an exact registration-number lookup and a
//!   full-text lookup, issued together. Both sources run together as well.
//! - Full-text lookups use websearch syntax first and retry once as plain text.
//! - Queries with characters outside `[A-Za-z0-9\s]` skip full-text entirely.
//!
//! ## Precedence
//! Food exact > drug exact > top drug full-text > top food full-text. A result
//! is drug-origin when the drug source produced anything and the food source
//! has no exact match. The losing exact match, if any, leads the alternatives.
//!
//! ## Failures
//! Lookups fail independently. A request only fails when nothing matched
//! exactly, no full-text rows came back, and at least one lookup errored.
use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    error::{SourceError, VerifyError},
    models::{Category, RawRow, ScoredMatch, SourceKind, VerificationResult},
    normalize,
    source::{ProductSource, SearchMode},
    utils::has_special_characters,
};

pub const FUZZY_LIMIT: usize = 10;

pub const VERIFIED_MESSAGE: &str = "Product verified via full-text search.";
pub const CLOSEST_MESSAGE: &str = "No exact registration match found. Showing closest matches.";
pub const NOT_FOUND_MESSAGE: &str = "Product not found in database.";

pub const SUGGESTIONS: [&str; 3] = [
    "Check the registration number for typos.",
    "Try searching by brand name, generic name, or manufacturer instead.",
    "Make sure the selected category matches the product.",
];

struct Lookup {
    exact: Result<Option<RawRow>, SourceError>,
    fuzzy: Option<Result<Vec<RawRow>, SourceError>>,
}

#[derive(Default)]
struct Outcome {
    exact: Option<RawRow>,
    fuzzy: Vec<RawRow>,
}

impl Outcome {
    fn settle(lookup: Option<Lookup>, failures: &mut Vec<SourceError>) -> Self {
        let Some(lookup) = lookup else {
            return Self::default();
        };

        let exact = lookup.exact.unwrap_or_else(|e| {
            failures.push(e);
            None
        });
        let fuzzy = match lookup.fuzzy {
            Some(Ok(rows)) => rows,
            Some(Err(e)) => {
                failures.push(e);
                Vec::new()
            }
            None => Vec::new(),
        };

        Self { exact, fuzzy }
    }

    fn has_any(&self) -> bool {
        self.exact.is_some() || !self.fuzzy.is_empty()
    }
}

pub async fn verify<S: ProductSource>(
    source: &S,
    query: &str,
    category: Category,
) -> Result<VerificationResult, VerifyError> {
    let term = query.trim();
    if term.is_empty() {
        return Err(VerifyError::EmptyQuery);
    }

    let fuzzy = !has_special_characters(term);
    if !fuzzy {
        debug!(term, "Special characters in query, exact lookups only");
    }

    let (food, drug) = tokio::join!(
        lookup_if(source, category, SourceKind::Food, term, fuzzy),
        lookup_if(source, category, SourceKind::Drug, term, fuzzy),
    );

    let mut failures = Vec::new();
    let food = Outcome::settle(food, &mut failures);
    let drug = Outcome::settle(drug, &mut failures);

    let is_verified = food.exact.is_some() || drug.exact.is_some();
    let total_matches = food.fuzzy.len() + drug.fuzzy.len();

    if !is_verified && total_matches == 0 {
        if let Some(failure) = failures.into_iter().next() {
            return Err(failure.into());
        }
    } else if !failures.is_empty() {
        warn!(
            term,
            failed = failures.len(),
            "Some lookups failed, continuing with partial results"
        );
    }

    let source_kind = if drug.has_any() && food.exact.is_none() {
        SourceKind::Drug
    } else {
        SourceKind::Food
    };
    let (origin, other) = match source_kind {
        SourceKind::Drug => (drug, food),
        SourceKind::Food => (food, drug),
    };

    let origin_scored = normalize::scored(origin.fuzzy, term);
    let other_scored = normalize::scored(other.fuzzy, term);

    let primary_match = match origin.exact {
        Some(row) => Some(normalize::exact(row)),
        None => origin_scored.first().cloned(),
    };

    let candidates = other
        .exact
        .map(normalize::exact)
        .into_iter()
        .chain(origin_scored)
        .chain(other_scored);
    let alternative_matches = alternatives(primary_match.as_ref(), candidates);

    let message = if is_verified {
        VERIFIED_MESSAGE
    } else if total_matches > 0 {
        CLOSEST_MESSAGE
    } else {
        NOT_FOUND_MESSAGE
    };
    let suggestions = if !is_verified && total_matches == 0 {
        SUGGESTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    Ok(VerificationResult {
        queried_term: query.to_string(),
        is_verified,
        source_kind,
        primary_match,
        alternative_matches,
        total_matches,
        message: message.to_string(),
        suggestions,
    })
}

async fn lookup_if<S: ProductSource>(
    source: &S,
    category: Category,
    kind: SourceKind,
    term: &str,
    fuzzy: bool,
) -> Option<Lookup> {
    if !category.includes(kind) {
        return None;
    }

    let (exact, fuzzy) = tokio::join!(source.exact(kind, term), async {
        if fuzzy {
            Some(search_with_fallback(source, kind, term).await)
        } else {
            None
        }
    });

    Some(Lookup { exact, fuzzy })
}

async fn search_with_fallback<S: ProductSource>(
    source: &S,
    kind: SourceKind,
    term: &str,
) -> Result<Vec<RawRow>, SourceError> {
    match source
        .search(kind, term, SearchMode::WebSearch, FUZZY_LIMIT)
        .await
    {
        Ok(rows) => Ok(rows),
        Err(e) => {
            warn!(%kind, error = %e, "Websearch lookup failed, retrying as plain text");

            source
                .search(kind, term, SearchMode::Plain, FUZZY_LIMIT)
                .await
        }
    }
}

/// Drops the primary and repeated identities, then orders by relevance. Ties
/// keep candidate order.
fn alternatives(
    primary: Option<&ScoredMatch>,
    candidates: impl Iterator<Item = ScoredMatch>,
) -> Vec<ScoredMatch> {
    let mut seen = HashSet::new();
    if let Some(primary) = primary {
        seen.insert((primary.record.source_kind, primary.record.identifier.clone()));
    }

    let mut matches: Vec<ScoredMatch> = candidates
        .filter(|m| seen.insert((m.record.source_kind, m.record.identifier.clone())))
        .collect();
    matches.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    matches
}

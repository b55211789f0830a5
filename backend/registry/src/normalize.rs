//! # Normalization
//!
//! The food and drug tables disagree on field names, so every row goes
//! through one mapping per source before anything else sees it.
//!
//! | unified        | food                             | drug                             |
//! |----------------|----------------------------------|----------------------------------|
//! | `identifier`   | `registration_number`            | `registration_number`            |
//! | `display_name` | `brand_name` → `product_name`    | `brand_name` → `generic_name`    |
//! | `manufacturer` | `company_name`                   | `manufacturer`                   |
//! | `category`     | `category`, default "Food"       | "Drug"                           |
//!
//! Missing or blank names fall back to the registration number, missing
//! manufacturers to [`UNKNOWN_MANUFACTURER`].
//!
//! ## Scoring
//!
//! Fuzzy rows carry a relevance fraction in `[0, 1]`: 70% token overlap between
//! the query and the row's searchable fields, 30% position in the backend's
//! ranking. Exact matches are always `1.0`.
use crate::{
    models::{
        CatalogRow, DrugRow, FoodRow, ProductRecord, RawRow, ScoredMatch, SourceKind,
        UNKNOWN_MANUFACTURER,
    },
    resolve::FUZZY_LIMIT,
    utils::{present, tokens},
};

const OVERLAP_WEIGHT: f64 = 0.7;
const RANK_WEIGHT: f64 = 0.3;

pub fn food(row: FoodRow) -> ProductRecord {
    let display_name = present(&row.brand_name)
        .or(present(&row.product_name))
        .unwrap_or(row.registration_number.as_str())
        .to_string();

    ProductRecord {
        display_name,
        manufacturer: present(&row.company_name)
            .unwrap_or(UNKNOWN_MANUFACTURER)
            .to_string(),
        category: present(&row.category).unwrap_or("Food").to_string(),
        issuance_date: row.issuance_date,
        expiry_date: row.expiry_date,
        source_kind: SourceKind::Food,
        identifier: row.registration_number,
    }
}

pub fn drug(row: DrugRow) -> ProductRecord {
    let display_name = present(&row.brand_name)
        .or(present(&row.generic_name))
        .unwrap_or(row.registration_number.as_str())
        .to_string();

    ProductRecord {
        display_name,
        manufacturer: present(&row.manufacturer)
            .unwrap_or(UNKNOWN_MANUFACTURER)
            .to_string(),
        category: "Drug".to_string(),
        issuance_date: row.issuance_date,
        expiry_date: row.expiry_date,
        source_kind: SourceKind::Drug,
        identifier: row.registration_number,
    }
}

pub fn catalog(row: CatalogRow) -> ProductRecord {
    ProductRecord {
        display_name: present(&row.display_name)
            .unwrap_or(row.registration_number.as_str())
            .to_string(),
        manufacturer: present(&row.manufacturer)
            .unwrap_or(UNKNOWN_MANUFACTURER)
            .to_string(),
        category: present(&row.category)
            .unwrap_or(row.source_kind.default_category())
            .to_string(),
        issuance_date: row.issuance_date,
        expiry_date: row.expiry_date,
        source_kind: row.source_kind,
        identifier: row.registration_number,
    }
}

pub fn record(row: RawRow) -> ProductRecord {
    match row {
        RawRow::Food(row) => food(row),
        RawRow::Drug(row) => drug(row),
    }
}

pub fn exact(row: RawRow) -> ScoredMatch {
    ScoredMatch {
        record: record(row),
        relevance_score: 1.0,
    }
}

/// Scores fuzzy rows in backend rank order.
pub fn scored(rows: Vec<RawRow>, query: &str) -> Vec<ScoredMatch> {
    let query_tokens = tokens(query);

    rows.into_iter()
        .enumerate()
        .map(|(rank, row)| {
            let overlap = overlap(&query_tokens, &searchable_tokens(&row));
            let decay = 1.0 - (rank.min(FUZZY_LIMIT) as f64 / FUZZY_LIMIT as f64);
            let score = OVERLAP_WEIGHT * overlap + RANK_WEIGHT * decay;

            ScoredMatch {
                record: record(row),
                relevance_score: ((score * 100.0).round() / 100.0).clamp(0.0, 1.0),
            }
        })
        .collect()
}

fn searchable_tokens(row: &RawRow) -> Vec<String> {
    let fields: [&Option<String>; 3] = match row {
        RawRow::Food(r) => [&r.product_name, &r.brand_name, &r.company_name],
        RawRow::Drug(r) => [&r.generic_name, &r.brand_name, &r.manufacturer],
    };

    let mut all = tokens(row.registration_number());
    for field in fields.into_iter().filter_map(present) {
        all.extend(tokens(field));
    }

    all
}

fn overlap(query: &[String], candidate: &[String]) -> f64 {
    if query.is_empty() {
        return 0.0;
    }

    let hits = query
        .iter()
        .filter(|q| candidate.iter().any(|c| c.starts_with(q.as_str())))
        .count();

    hits as f64 / query.len() as f64
}

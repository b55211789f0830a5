use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

pub const FOOD_TABLE: &str = "food_products";
pub const DRUG_TABLE: &str = "drug_products";
pub const CATALOG_VIEW: &str = "all_products";

pub const REGISTRATION_NUMBER: &str = "registration_number";
pub const SEARCH_VECTOR: &str = "search_vector";
pub const DISPLAY_NAME: &str = "display_name";
pub const CATEGORY: &str = "category";

pub const UNKNOWN_MANUFACTURER: &str = "Unknown manufacturer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Food,
    Drug,
}

impl SourceKind {
    pub fn table(self) -> &'static str {
        match self {
            SourceKind::Food => FOOD_TABLE,
            SourceKind::Drug => DRUG_TABLE,
        }
    }

    pub fn default_category(self) -> &'static str {
        match self {
            SourceKind::Food => "Food",
            SourceKind::Drug => "Drug",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Food => f.write_str("food"),
            SourceKind::Drug => f.write_str("drug"),
        }
    }
}

/// Category filter shared by verification and catalog browsing.
///
/// Cosmetics are registered in the food table, so [`Category::Cosmetic`]
/// searches the food source during verification and narrows the catalog by
/// its normalized `category` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    All,
    Food,
    Drug,
    Cosmetic,
}

impl Category {
    pub fn sources(self) -> &'static [SourceKind] {
        match self {
            Category::All => &[SourceKind::Food, SourceKind::Drug],
            Category::Food | Category::Cosmetic => &[SourceKind::Food],
            Category::Drug => &[SourceKind::Drug],
        }
    }

    pub fn includes(self, kind: SourceKind) -> bool {
        self.sources().contains(&kind)
    }

    /// Value of the unified view's `category` column, `None` for no filter.
    pub fn catalog_value(self) -> Option<&'static str> {
        match self {
            Category::All => None,
            Category::Food => Some("Food"),
            Category::Drug => Some("Drug"),
            Category::Cosmetic => Some("Cosmetic"),
        }
    }
}

impl FromStr for Category {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Category::All),
            "food" | "foods" => Ok(Category::Food),
            "drug" | "drugs" => Ok(Category::Drug),
            "cosmetic" | "cosmetics" => Ok(Category::Cosmetic),
            _ => Err(VerifyError::InvalidCategory(s.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_value().unwrap_or("All"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodRow {
    pub registration_number: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub issuance_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugRow {
    pub registration_number: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub dosage_strength: Option<String>,
    #[serde(default)]
    pub dosage_form: Option<String>,
    #[serde(default)]
    pub issuance_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Row of the unified `all_products` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub registration_number: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub source_kind: SourceKind,
    #[serde(default)]
    pub issuance_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// A row as one of the two per-source tables returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Food(FoodRow),
    Drug(DrugRow),
}

impl RawRow {
    pub fn kind(&self) -> SourceKind {
        match self {
            RawRow::Food(_) => SourceKind::Food,
            RawRow::Drug(_) => SourceKind::Drug,
        }
    }

    pub fn registration_number(&self) -> &str {
        match self {
            RawRow::Food(row) => &row.registration_number,
            RawRow::Drug(row) => &row.registration_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub identifier: String,
    pub display_name: String,
    pub manufacturer: String,
    pub category: String,
    pub issuance_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub source_kind: SourceKind,
}

impl ProductRecord {
    /// The registry had no name for this row, so it shows its registration number.
    pub fn is_unnamed(&self) -> bool {
        self.display_name == self.identifier
    }

    /// Catalog order: named rows by display name, then unnamed rows, ties
    /// broken by registration number. Matches `nullslast` on the unified view.
    pub fn catalog_order(&self, other: &ProductRecord) -> Ordering {
        self.is_unnamed()
            .cmp(&other.is_unnamed())
            .then_with(|| self.display_name.cmp(&other.display_name))
            .then_with(|| self.identifier.cmp(&other.identifier))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMatch {
    #[serde(flatten)]
    pub record: ProductRecord,
    /// Fraction in `[0, 1]`.
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub queried_term: String,
    pub is_verified: bool,
    pub source_kind: SourceKind,
    pub primary_match: Option<ScoredMatch>,
    pub alternative_matches: Vec<ScoredMatch>,
    pub total_matches: usize,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub page: usize,
    pub records: Vec<ProductRecord>,
    pub total_count: usize,
    pub has_more: bool,
}

//! # Hosted database
//!
//! Thin client over the PostgREST interface of the hosted product database.
//!
//! ## Schema
//! - `food_products`: registration_number, product_name, brand_name, company_name, category, issuance_date, expiry_date
//! - `drug_products`: registration_number, generic_name, brand_name, manufacturer, dosage_strength, dosage_form, issuance_date, expiry_date
//! - `all_products` (view): registration_number, display_name, manufacturer, category, source_kind, issuance_date, expiry_date
//!
//! Every table carries a precomputed `search_vector` column. Ranking and index
//! configuration live in the database.
//!
//! ## Commands
//!
//! Peek at a table.
//! ```sh
//! curl -H "apikey: $SUPABASE_ANON_KEY" "$SUPABASE_URL/rest/v1/drug_products?select=*&limit=5"
//! ```
use std::time::Duration;

use reqwest::{Client, RequestBuilder, header::CONTENT_RANGE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::SourceError,
    models::{
        CATALOG_VIEW, CATEGORY, CatalogRow, DISPLAY_NAME, DrugRow, FoodRow, REGISTRATION_NUMBER,
        RawRow, SEARCH_VECTOR, SourceKind,
    },
    source::{PageQuery, Paged, ProductSource, SearchMode},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct PostgrestSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestSource {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, table: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*")])
    }

    async fn rows_of(
        &self,
        kind: SourceKind,
        request: RequestBuilder,
    ) -> Result<Vec<RawRow>, SourceError> {
        let rows = match kind {
            SourceKind::Food => {
                let (rows, _) = fetch::<FoodRow>(request).await?;
                rows.into_iter().map(RawRow::Food).collect()
            }
            SourceKind::Drug => {
                let (rows, _) = fetch::<DrugRow>(request).await?;
                rows.into_iter().map(RawRow::Drug).collect()
            }
        };

        Ok(rows)
    }
}

impl ProductSource for PostgrestSource {
    async fn exact(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> Result<Option<RawRow>, SourceError> {
        debug!(%kind, identifier, "Exact lookup");

        let request = self.request(kind.table()).query(&[
            (REGISTRATION_NUMBER, format!("eq.{identifier}")),
            ("limit", "1".to_string()),
        ]);

        Ok(self.rows_of(kind, request).await?.into_iter().next())
    }

    async fn search(
        &self,
        kind: SourceKind,
        term: &str,
        mode: SearchMode,
        limit: usize,
    ) -> Result<Vec<RawRow>, SourceError> {
        debug!(%kind, term, ?mode, "Full-text lookup");

        let request = self.request(kind.table()).query(&[
            (SEARCH_VECTOR, format!("{}.{term}", mode.operator())),
            ("limit", limit.to_string()),
        ]);

        self.rows_of(kind, request).await
    }

    async fn page(&self, query: &PageQuery) -> Result<Paged, SourceError> {
        debug!(?query, "Catalog page");

        let request = self
            .request(CATALOG_VIEW)
            .header("Prefer", "count=exact")
            .query(&page_params(query));

        let (rows, content_range) = fetch::<CatalogRow>(request).await?;
        let total = parse_total(content_range.as_deref())?;

        Ok(Paged { rows, total })
    }
}

/// Unnamed rows sort last, the same place [`ProductRecord::catalog_order`]
/// puts them after normalization.
///
/// [`ProductRecord::catalog_order`]: crate::models::ProductRecord::catalog_order
pub fn page_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        (
            "order",
            format!("{DISPLAY_NAME}.asc.nullslast,{REGISTRATION_NUMBER}.asc"),
        ),
        ("offset", query.offset.to_string()),
        ("limit", query.limit.to_string()),
    ];
    if let Some(category) = query.category.catalog_value() {
        params.push((CATEGORY, format!("eq.{category}")));
    }
    if let Some(term) = &query.search {
        params.push((SEARCH_VECTOR, format!("{}.{term}", SearchMode::WebSearch.operator())));
    }

    params
}

async fn fetch<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<(Vec<T>, Option<String>), SourceError> {
    let res = request.send().await?;
    let status = res.status();

    #[cfg(feature = "verbose")]
    println!("Status: {}\n", status);

    let content_range = res
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = res.text().await?;

    if !status.is_success() {
        return Err(SourceError::Status { status, body });
    }

    let rows = serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;

    Ok((rows, content_range))
}

/// Total from a `Content-Range` header such as `0-29/1234` or `*/0`.
pub fn parse_total(content_range: Option<&str>) -> Result<usize, SourceError> {
    let header =
        content_range.ok_or_else(|| SourceError::Decode("missing Content-Range".to_string()))?;

    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.parse().ok())
        .ok_or_else(|| SourceError::Decode(format!("unusable Content-Range: {header}")))
}

#[cfg(test)]
mod tests {
    use super::{page_params, parse_total};
    use crate::{models::Category, source::PageQuery};

    #[test]
    fn test_page_params() {
        let params = page_params(&PageQuery {
            category: Category::Drug,
            search: Some("aspirin".to_string()),
            offset: 60,
            limit: 30,
        });

        assert_eq!(
            params,
            [
                ("order", "display_name.asc.nullslast,registration_number.asc".to_string()),
                ("offset", "60".to_string()),
                ("limit", "30".to_string()),
                ("category", "eq.Drug".to_string()),
                ("search_vector", "wfts.aspirin".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total(Some("0-29/1234")).unwrap(), 1234);
        assert_eq!(parse_total(Some("*/0")).unwrap(), 0);
        assert!(parse_total(Some("0-29/*")).is_err());
        assert!(parse_total(None).is_err());
    }

    #[test]
    fn test_base_url_trimmed() {
        let source = super::PostgrestSource::new("https://db.example.com/", "key").unwrap();
        assert_eq!(source.base_url, "https://db.example.com");
    }
}

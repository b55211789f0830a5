use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use registry::{
    catalog::fetch_page,
    models::{CatalogPage, Category, VerificationResult},
    resolve::verify,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::AppError, state::State as AppState};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductsParams {
    #[serde(default)]
    pub category: String,
    pub search: Option<String>,
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SearchCount {
    pub count: u64,
}

pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerificationResult>, AppError> {
    let category: Category = params.category.parse()?;
    let result = verify(&state.registry, &params.q, category).await?;

    // The tally is best effort; a Redis hiccup must not fail the lookup.
    match state.tally.increment().await {
        Ok(count) => debug!(count, "Search counted"),
        Err(e) => warn!(error = %e, "Failed to count search"),
    }

    Ok(Json(result))
}

pub async fn products_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductsParams>,
) -> Result<Json<CatalogPage>, AppError> {
    let category: Category = params.category.parse()?;
    let page = fetch_page(
        &state.registry,
        category,
        params.search.as_deref(),
        params.page,
    )
    .await?;

    Ok(Json(page))
}

pub async fn searches_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SearchCount>, AppError> {
    Ok(Json(SearchCount {
        count: state.tally.count().await?,
    }))
}

pub async fn health_handler() -> &'static str {
    "ok"
}

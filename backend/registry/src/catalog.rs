use tracing::debug;

use crate::{
    error::FetchError,
    models::{CatalogPage, Category},
    normalize,
    source::{PageQuery, ProductSource},
};

pub const PAGE_SIZE: usize = 30;
pub const MIN_SEARCH_CHARS: usize = 2;

/// Trimmed search term, or `None` when it has fewer than two non-whitespace
/// characters.
pub fn effective_search(term: Option<&str>) -> Option<String> {
    let term = term?.trim();

    (term.chars().filter(|c| !c.is_whitespace()).count() >= MIN_SEARCH_CHARS)
        .then(|| term.to_string())
}

/// Fails for page indexes whose offset does not fit in `usize`.
pub fn page_query(
    category: Category,
    search: Option<&str>,
    page: usize,
) -> Result<PageQuery, FetchError> {
    let offset = page
        .checked_mul(PAGE_SIZE)
        .ok_or(FetchError::PageOutOfRange(page))?;

    Ok(PageQuery {
        category,
        search: effective_search(search),
        offset,
        limit: PAGE_SIZE,
    })
}

pub async fn fetch_page<S: ProductSource>(
    source: &S,
    category: Category,
    search: Option<&str>,
    page: usize,
) -> Result<CatalogPage, FetchError> {
    let query = page_query(category, search, page)?;
    let paged = source.page(&query).await?;

    let has_more = query
        .offset
        .checked_add(PAGE_SIZE)
        .is_some_and(|end| end < paged.total);
    debug!(%category, page, total = paged.total, has_more, "Fetched catalog page");

    Ok(CatalogPage {
        page,
        records: paged.rows.into_iter().map(normalize::catalog).collect(),
        total_count: paged.total,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        memory::{Call, Failure, Fixture, MemorySource, tests::sample},
        models::{DrugRow, FoodRow},
    };

    fn bulk(food: usize, drug: usize) -> MemorySource {
        MemorySource::new(Fixture {
            food: (0..food)
                .map(|i| FoodRow {
                    registration_number: format!("FR-{i:05}"),
                    product_name: Some(format!("Snack {:03}", (i * 13) % food)),
                    ..Default::default()
                })
                .collect(),
            drug: (0..drug)
                .map(|i| DrugRow {
                    registration_number: format!("DR-{i:05}"),
                    generic_name: Some(format!("Tablet {i:03}")),
                    ..Default::default()
                })
                .collect(),
        })
    }

    #[test]
    fn test_effective_search() {
        assert_eq!(effective_search(None), None);
        assert_eq!(effective_search(Some("  a  ")), None);
        assert_eq!(effective_search(Some("ab")), Some("ab".to_string()));
        assert_eq!(effective_search(Some(" a b ")), Some("a b".to_string()));
        assert_eq!(effective_search(Some("   ")), None);
    }

    #[test]
    fn test_page_query_bounds() {
        let query = page_query(Category::Food, Some("rice"), 2).unwrap();

        assert_eq!(query.offset, 60);
        assert_eq!(query.limit, PAGE_SIZE);
        assert_eq!(query.search.as_deref(), Some("rice"));
    }

    #[tokio::test]
    async fn test_walk_all_pages() {
        let source = bulk(70, 45);
        let mut records = Vec::new();
        let mut page = 0;

        loop {
            let fetched = fetch_page(&source, Category::All, None, page).await.unwrap();
            assert_eq!(fetched.total_count, 115);
            assert!(fetched.records.len() <= PAGE_SIZE);

            records.extend(fetched.records);
            if !fetched.has_more {
                break;
            }
            page += 1;
        }

        assert_eq!(page, 3);
        assert_eq!(records.len(), 115);

        let unique: HashSet<_> = records
            .iter()
            .map(|r| (r.source_kind, r.identifier.clone()))
            .collect();
        assert_eq!(unique.len(), 115);
        assert!(records.windows(2).all(|w| w[0].display_name <= w[1].display_name));
    }

    #[tokio::test]
    async fn test_single_character_search_ignored() {
        let source = sample();

        let one = fetch_page(&source, Category::All, Some(" a "), 0).await.unwrap();
        let two = fetch_page(&source, Category::All, Some("as"), 0).await.unwrap();

        assert_eq!(one.total_count, 6);
        assert!(two.total_count < one.total_count);
        assert!(matches!(&source.calls()[0], Call::Page(q) if q.search.is_none()));
        assert!(matches!(&source.calls()[1], Call::Page(q) if q.search.as_deref() == Some("as")));
    }

    #[tokio::test]
    async fn test_category_filter() {
        let source = bulk(10, 4);

        let page = fetch_page(&source, Category::Drug, None, 0).await.unwrap();

        assert_eq!(page.total_count, 4);
        assert!(!page.has_more);
        assert!(page.records.iter().all(|r| r.category == "Drug"));
    }

    #[tokio::test]
    async fn test_huge_page_rejected() {
        let source = sample();
        let page = usize::MAX / PAGE_SIZE + 1;

        let result = fetch_page(&source, Category::All, None, page).await;

        assert!(matches!(result, Err(FetchError::PageOutOfRange(p)) if p == page));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_last_addressable_page() {
        let source = sample();
        let page = usize::MAX / PAGE_SIZE;

        let fetched = fetch_page(&source, Category::All, None, page).await.unwrap();

        assert!(fetched.records.is_empty());
        assert!(!fetched.has_more);
    }

    #[tokio::test]
    async fn test_failure_is_typed() {
        let source = sample();
        source.fail(Failure::Page);

        let result = fetch_page(&source, Category::All, None, 0).await;

        assert!(matches!(result, Err(FetchError::Backend(_))));
    }
}

//! # Catalog Sweep
//!
//! Operator tooling around the registry.
//!
//! ## Catalog
//! Walks the browsable catalog page by page, exactly as a scrolling client
//! would, and checks the pagination contract along the way:
//! - every page but the last is full
//! - records arrive in catalog order (named rows by display name, unnamed rows last)
//! - no record shows up twice
//! - the number of records equals the reported total
//!
//! The walk stops at the first failed page; everything fetched until then is
//! still reported.
//!
//! ## Verify
//! One-off lookups print the same JSON the `/verify` endpoint returns.
use std::{cmp::Ordering, collections::HashSet, fs::File, io::BufWriter, path::Path};

use indicatif::{ProgressBar, ProgressStyle};
use registry::{
    catalog::{PAGE_SIZE, fetch_page},
    error::FetchError,
    models::{Category, ProductRecord, SourceKind},
    source::ProductSource,
};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct SweepReport {
    pub pages: usize,
    pub records: Vec<ProductRecord>,
    pub total_count: usize,
    pub duplicates: Vec<(SourceKind, String)>,
    pub out_of_order: usize,
    pub short_pages: Vec<usize>,
}

impl SweepReport {
    pub fn is_consistent(&self) -> bool {
        self.duplicates.is_empty()
            && self.out_of_order == 0
            && self.short_pages.is_empty()
            && self.records.len() == self.total_count
    }
}

pub fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);

    match ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(e) => warn!("Invalid progress template: {e}"),
    }

    pb
}

pub async fn sweep_catalog<S: ProductSource>(
    source: &S,
    category: Category,
    search: Option<&str>,
    pb: &ProgressBar,
) -> Result<SweepReport, (SweepReport, FetchError)> {
    let mut report = SweepReport::default();
    let mut seen = HashSet::new();

    loop {
        let page = match fetch_page(source, category, search, report.pages).await {
            Ok(page) => page,
            Err(e) => {
                pb.abandon_with_message(format!("Page {} failed", report.pages));
                return Err((report, e));
            }
        };

        if report.pages == 0 {
            pb.set_length(page.total_count.div_ceil(PAGE_SIZE) as u64);
        }
        if page.has_more && page.records.len() < PAGE_SIZE {
            warn!(page = page.page, len = page.records.len(), "Short page before the end");
            report.short_pages.push(page.page);
        }

        for record in page.records {
            if let Some(last) = report.records.last() {
                if last.catalog_order(&record) == Ordering::Greater {
                    report.out_of_order += 1;
                }
            }
            if !seen.insert((record.source_kind, record.identifier.clone())) {
                warn!(identifier = %record.identifier, "Duplicate record");
                report.duplicates.push((record.source_kind, record.identifier.clone()));
            }
            report.records.push(record);
        }

        report.total_count = page.total_count;
        report.pages += 1;

        pb.inc(1);
        pb.set_message(format!("{} records", report.records.len()));

        if !page.has_more {
            break;
        }
    }

    pb.finish_with_message(format!("{} records", report.records.len()));
    info!(
        pages = report.pages,
        records = report.records.len(),
        total = report.total_count,
        "Catalog sweep finished"
    );

    Ok(report)
}

pub fn write_records(path: impl AsRef<Path>, records: &[ProductRecord]) -> anyhow::Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, records)?;

    info!("Wrote {} records to {}", records.len(), path.as_ref().display());

    Ok(())
}

use std::{env, path::PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use registry::{Registry, models::Category, resolve::verify};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Local fixture to use instead of the hosted registry.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one product and print the verification result.
    Verify {
        query: String,

        #[arg(long, default_value = "all")]
        category: Category,
    },

    /// Walk the whole catalog and check pagination.
    Catalog {
        #[arg(long, default_value = "all")]
        category: Category,

        #[arg(long)]
        search: Option<String>,

        /// Write every fetched record here as JSON.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn registry(fixture: Option<PathBuf>) -> anyhow::Result<Registry> {
    if let Some(path) = fixture {
        return Ok(Registry::fixture(path)?);
    }

    let url = env::var("SUPABASE_URL").context("SUPABASE_URL not set and no --fixture given")?;
    let key = env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY not set")?;

    Ok(Registry::remote(&url, &key)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let registry = registry(args.fixture)?;

    match args.command {
        Command::Verify { query, category } => {
            let result = verify(&registry, &query, category).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Catalog {
            category,
            search,
            out,
        } => {
            let pb = sweep::progress_bar();
            let report = match sweep::sweep_catalog(&registry, category, search.as_deref(), &pb)
                .await
            {
                Ok(report) => report,
                Err((report, e)) => {
                    warn!("Sweep stopped after {} pages", report.pages);
                    return Err(e.into());
                }
            };

            println!("Pages: {}", report.pages);
            println!("Records: {} of {}", report.records.len(), report.total_count);
            println!("Duplicates: {}", report.duplicates.len());
            println!("Out of order: {}", report.out_of_order);

            if let Some(path) = out {
                sweep::write_records(path, &report.records)?;
            }

            if !report.is_consistent() {
                bail!("Catalog pagination is inconsistent");
            }
        }
    }

    Ok(())
}

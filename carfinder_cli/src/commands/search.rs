//! The `search` subcommand: scrape regions for matching listings and store the new ones.

use std::path::PathBuf;

use anyhow::Result;
use carfinder_lib::{
    validation, Archive, CsvExport, Db, Driver, DumpObserver, RegionTable, RetryConfig,
    RetryingClient, RunSummary, SearchSpec, UndatedPolicy,
};
use clap::Args;

use crate::output::{print_listings, OutputFormat};

/// Arguments for the `search` subcommand.
///
/// Defaults reproduce the stock search: Mazda CX-30 in Los Angeles, San Diego
/// and the SF Bay Area, at most 25 new listings.
#[derive(Args)]
pub struct SearchArgs {
    /// Car make
    #[arg(long, default_value = "Mazda")]
    pub make: String,

    /// Car model
    #[arg(long, default_value = "CX-30")]
    pub model: String,

    /// Override the search text (default: "<make> <model>")
    #[arg(long)]
    pub query: Option<String>,

    /// Regions to search, in order (space or comma separated)
    #[arg(
        long,
        num_args = 1..,
        value_delimiter = ',',
        default_values_t = ["losangeles".to_string(), "sandiego".to_string(), "sfbay".to_string()]
    )]
    pub regions: Vec<String>,

    /// Owner listings only (cto) instead of all sellers (cta)
    #[arg(long)]
    pub owner: bool,

    /// Oldest acceptable model year
    #[arg(long)]
    pub min_year: Option<i32>,

    /// Newest acceptable model year
    #[arg(long)]
    pub max_year: Option<i32>,

    /// Keywords that must all appear in the title
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub must: Vec<String>,

    /// Keywords that must not appear in the title
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Maximum number of new listings to save across all regions
    #[arg(long, default_value = "25")]
    pub limit: usize,

    /// Seconds between result pages (a random 0.3-0.9s is added)
    #[arg(long, default_value = "2.5")]
    pub sleep: f64,

    /// Skip listings posted more than N days ago
    #[arg(long)]
    pub since: Option<u32>,

    /// With --since, also skip listings that carry no posted date
    #[arg(long)]
    pub exclude_undated: bool,

    /// SQLite database path
    #[arg(long, default_value = "carfinder.db")]
    pub db: PathBuf,

    /// CSV log path (appended to)
    #[arg(long, default_value = "carfinder.csv")]
    pub csv: PathBuf,

    /// Proxy URL (falls back to the CR_PROXY environment variable)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Write results pages that match no known layout to this file
    #[arg(long)]
    pub debug_dump: Option<PathBuf>,
}

fn build_spec(args: &SearchArgs) -> Result<SearchSpec> {
    let proxy = args
        .proxy
        .clone()
        .or_else(|| std::env::var("CR_PROXY").ok());
    let spec = SearchSpec::new(&args.make, &args.model)
        .with_query(args.query.as_deref())
        .with_regions(&args.regions)
        .with_owner_only(args.owner)
        .with_required_keywords(&args.must)
        .with_forbidden_keywords(&args.exclude)
        .with_year_range(args.min_year, args.max_year)
        .with_limit(args.limit)
        .with_delay(validation::validate_delay_secs(args.sleep)?)
        .with_since_days(args.since)
        .with_undated_policy(if args.exclude_undated {
            UndatedPolicy::Exclude
        } else {
            UndatedPolicy::Include
        })
        .with_proxy(proxy.as_deref());
    Ok(validation::validate_spec(&spec)?)
}

pub async fn run(args: &SearchArgs, format: &OutputFormat) -> Result<()> {
    let spec = build_spec(args)?;

    let db = Db::open(&args.db)?;
    db.init()?;
    let mut archive = Archive::new(db, CsvExport::new(&args.csv));

    let regions = RegionTable::new();
    let client = RetryingClient::new(RetryConfig::from_env(), spec.proxy.as_deref());
    let mut driver = Driver::new(client, &regions)?;
    if let Some(path) = &args.debug_dump {
        driver = driver.with_observer(Box::new(DumpObserver::new(path)));
    }

    eprintln!(
        "Searching {} for '{}' ({} new at most)",
        spec.regions.join(", "),
        spec.search_text(),
        spec.limit
    );
    let summary = driver.run(&spec, &mut archive).await?;

    if !summary.new_listings.is_empty() {
        print_listings(&summary.new_listings, format)?;
    }
    print_summary(&summary, args);
    Ok(())
}

fn print_summary(summary: &RunSummary, args: &SearchArgs) {
    for region in &summary.regions {
        match &region.failure {
            Some(reason) => eprintln!("  {}: failed ({})", region.region, reason),
            None => eprintln!(
                "  {}: {} new, {} duplicate, {} rejected, {} page(s){}",
                region.region,
                region.new,
                region.duplicates,
                region.rejected,
                region.pages,
                if region.feed_fallbacks > 0 {
                    " via feed"
                } else {
                    ""
                }
            ),
        }
    }
    eprintln!(
        "Done. New listings added: {}. CSV: {}  DB: {}",
        summary.new_count(),
        args.csv.display(),
        args.db.display()
    );
    if summary.limit_reached {
        eprintln!("Stopped at the limit of {} new listings.", args.limit);
    }
}

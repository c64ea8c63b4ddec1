//! CarCupid command line: score and rank vehicles, browse the dataset and
//! tally live listings.
//!
//! Usage:
//!     carcupid score --weight sport=0.8 --weight economy=0
//!     carcupid dataset --all
//!     carcupid listings --pages 2
//!     carcupid vin WP0AF2A99KS165242 --decode

use anyhow::{bail, Context, Result};
use carcupid_backend_autodev::{vin_list, AutoDevClient, AutoDevConfig, ListingsPage};
use carcupid_backend_sheets::file::parse_grid;
use carcupid_backend_sheets::{
    CachedSource, DirCache, FileSource, ServiceAccount, SessionCache, SheetsAuth, SheetsBackend,
    SheetsConfig, TabularSource,
};
use carcupid_explain::{explain_result, render_bar, row_card, MarketTally};
use carcupid_features::{Dataset, VehicleColumns, BODY_OFFSET, HEADER_ROW};
use carcupid_model::{Grid, Trait, WeightVector};
use carcupid_query::{DatasetScope, ListingsQuery, SheetRequest, DEFAULT_RANGE};
use carcupid_rank::{rank, vehicle_title, Scorer};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carcupid")]
#[command(about = "Match vehicles to your personality traits")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Spreadsheet holding the vehicle database
    #[arg(long, env = "GOOGLE_SHEETS_SPREADSHEET_ID", default_value = "")]
    sheet_id: String,

    /// Sheet range to read
    #[arg(long, env = "SHEET_NAME", default_value = DEFAULT_RANGE)]
    range: String,

    /// Persist fetched sheets here instead of caching for this run only
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_SHEETS_API_KEY", hide_env_values = true)]
    sheets_api_key: Option<String>,

    #[arg(long, env = "GOOGLE_SHEETS_ACCESS_TOKEN", hide_env_values = true)]
    sheets_access_token: Option<String>,

    /// Base64 service account JSON
    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_B64", hide_env_values = true)]
    service_account: Option<String>,

    #[arg(long, env = "AUTO_DEV_API_KEY", hide_env_values = true, default_value = "")]
    auto_dev_key: String,

    /// VINs to decode when no listings come back (comma separated)
    #[arg(long, env = "AUTO_DEV_VINS", default_value = "")]
    auto_dev_vins: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Score vehicles and rank them against trait weights
    Score {
        /// Read the grid from a JSON file instead of the sheet
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Trait weight in [0, 1], e.g. `family=0.6`. Unset traits keep
        /// their defaults.
        #[arg(short, long = "weight", value_parser = parse_weight)]
        weights: Vec<(Trait, f64)>,

        /// Model year to keep
        #[arg(long)]
        year: Option<f64>,

        /// Score every row, not just the featured vehicles
        #[arg(long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(long, default_value_t = HEADER_ROW)]
        header_row: usize,

        #[arg(long, default_value_t = BODY_OFFSET)]
        body_offset: usize,
    },

    /// Show dataset rows as cards
    Dataset {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long)]
        year: Option<f64>,

        #[arg(long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Tally brands and models from live listings
    Listings {
        #[arg(long, default_value = "2018")]
        start_year: u32,

        #[arg(long, default_value = "2025")]
        end_year: u32,

        /// Listings per page
        #[arg(long, default_value = "100")]
        limit: u32,

        #[arg(long, default_value = "1")]
        pages: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Look up a listing by VIN
    Vin {
        vin: String,

        /// Decode make and model instead of fetching the listing
        #[arg(long)]
        decode: bool,
    },

    /// Show the spreadsheet title and tabs
    SheetInfo,

    /// Append rows from a JSON grid file to the sheet range
    Append {
        #[arg(long)]
        values: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("carcupid=info".parse()?))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Score {
            input,
            weights,
            year,
            all,
            format,
            limit,
            header_row,
            body_offset,
        } => {
            let grid = load_grid(&cli, input.as_deref()).await?;
            let dataset = Dataset::with_layout(grid, *header_row, *body_offset);
            let weights = build_weights(weights);
            run_score(&dataset, &build_scope(*year, *all), &weights, *limit, format)?;
        }
        Commands::Dataset {
            input,
            year,
            all,
            format,
        } => {
            let grid = load_grid(&cli, input.as_deref()).await?;
            run_dataset(&Dataset::from_grid(grid), &build_scope(*year, *all), format)?;
        }
        Commands::Listings {
            start_year,
            end_year,
            limit,
            pages,
            format,
        } => {
            let query = ListingsQuery::new(*start_year, *end_year)
                .with_limit(*limit)
                .with_pages(*pages)
                .clamped();
            run_listings(&cli, &query, format).await?;
        }
        Commands::Vin { vin, decode } => {
            run_vin(&cli, vin, *decode).await?;
        }
        Commands::SheetInfo => {
            let backend = sheets_backend(&cli)?;
            let info = backend.sheet_info(&sheet_request(&cli)?.spreadsheet_id).await?;
            println!("{}", info.title);
            for sheet in &info.sheets {
                println!("  - {}", sheet);
            }
        }
        Commands::Append { values } => {
            let json = std::fs::read_to_string(values)
                .with_context(|| format!("reading {}", values.display()))?;
            let rows = parse_grid(&json)?;
            let response = sheets_backend(&cli)?
                .append_values(&sheet_request(&cli)?, &rows)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Parse a `trait=value` weight argument.
fn parse_weight(s: &str) -> Result<(Trait, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected trait=value, got '{s}'"))?;
    let t: Trait = name.parse().map_err(|e| format!("{e}"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{}'", value.trim()))?;
    Ok((t, value))
}

/// Default weights with the given overrides applied in order.
fn build_weights(overrides: &[(Trait, f64)]) -> WeightVector {
    overrides
        .iter()
        .fold(WeightVector::default(), |w, &(t, value)| w.with(t, value))
}

fn build_scope(year: Option<f64>, all: bool) -> DatasetScope {
    if all {
        return DatasetScope::all();
    }
    match year {
        Some(year) => DatasetScope::default().with_year(year),
        None => DatasetScope::default(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn sheet_request(cli: &Cli) -> Result<SheetRequest> {
    Ok(SheetRequest::new(cli.sheet_id.trim(), Some(cli.range.clone()))?)
}

fn sheets_backend(cli: &Cli) -> Result<SheetsBackend> {
    let auth = if let Some(b64) = non_empty(&cli.service_account) {
        SheetsAuth::ServiceAccount(ServiceAccount::from_base64(b64)?)
    } else if let Some(token) = non_empty(&cli.sheets_access_token) {
        SheetsAuth::BearerToken(token.to_string())
    } else if let Some(key) = non_empty(&cli.sheets_api_key) {
        SheetsAuth::ApiKey(key.to_string())
    } else {
        SheetsAuth::None
    };

    Ok(SheetsBackend::new(SheetsConfig {
        auth,
        ..Default::default()
    })?)
}

async fn fetch_cached<S>(source: S, cache_dir: Option<&Path>, request: &SheetRequest) -> Result<Grid>
where
    S: TabularSource + Sync,
{
    let grid = match cache_dir {
        Some(dir) => {
            CachedSource::new(source, DirCache::new(dir))
                .fetch_grid(request)
                .await?
        }
        None => {
            CachedSource::new(source, SessionCache::new())
                .fetch_grid(request)
                .await?
        }
    };
    Ok(grid)
}

async fn load_grid(cli: &Cli, input: Option<&Path>) -> Result<Grid> {
    if let Some(path) = input {
        let request = SheetRequest::new(path.display().to_string(), Some(cli.range.clone()))?;
        return Ok(FileSource::new(path).fetch_grid(&request).await?);
    }

    let request = sheet_request(cli).context("no sheet id; pass --sheet-id or --input")?;
    let grid = fetch_cached(sheets_backend(cli)?, cli.cache_dir.as_deref(), &request).await?;
    tracing::info!(rows = grid.len(), range = %request.range, "Loaded sheet");
    Ok(grid)
}

fn run_score(
    dataset: &Dataset,
    scope: &DatasetScope,
    weights: &WeightVector,
    limit: usize,
    format: &str,
) -> Result<()> {
    let scorer = Scorer::from_dataset(dataset);
    let rows = scope.filter(dataset);
    let ranked: Vec<_> = rank(scorer.score_rows(rows), weights)
        .into_iter()
        .take(limit)
        .collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No vehicles in scope");
        return Ok(());
    }

    for (i, result) in ranked.iter().enumerate() {
        let explanation = explain_result(result);
        println!("\n{}. {}", i + 1, result.title);
        println!("   {}", explanation.summary);
        println!("   {}", explanation.detail);
        for bar in &explanation.bars {
            println!(
                "   {:<14} {} {:>3.0}",
                bar.label,
                render_bar(bar.width, 20),
                bar.value
            );
        }
    }

    println!("\n---");
    println!("Total: {} results", ranked.len());

    Ok(())
}

fn run_dataset(dataset: &Dataset, scope: &DatasetScope, format: &str) -> Result<()> {
    let columns = VehicleColumns::resolve(&dataset.index);
    let cards: Vec<_> = scope
        .filter(dataset)
        .into_iter()
        .map(|row| row_card(&dataset.headers, row, &vehicle_title(row, &columns)))
        .collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    for card in &cards {
        println!("\n{}", card.title);
        for (header, value) in &card.fields {
            println!("   {}: {}", header, value);
        }
    }
    println!("\n---");
    println!("Total: {} rows", cards.len());

    Ok(())
}

#[derive(Serialize)]
struct ListingsReport {
    source: &'static str,
    statuses: Vec<u16>,
    count: usize,
    tally: MarketTally,
}

async fn run_listings(cli: &Cli, query: &ListingsQuery, format: &str) -> Result<()> {
    let client = autodev_client(cli)?;
    if !client.has_key() {
        tracing::warn!("AUTO_DEV_API_KEY is not set; no listings will be fetched");
    }

    let ListingsPage { items, statuses } = client.fetch_listings_with_meta(query).await;

    let report = if items.is_empty() {
        let vins = vin_list(&cli.auto_dev_vins);
        tracing::info!(vins = vins.len(), "No listings; decoding sample VINs");
        let decoded = client.decode_vins(&vins).await;
        ListingsReport {
            source: "vin",
            statuses,
            count: decoded.len(),
            tally: MarketTally::from_pairs(decoded.iter().map(|d| {
                (
                    d.make.as_deref().unwrap_or(""),
                    d.model.as_deref().unwrap_or(""),
                )
            })),
        }
    } else {
        ListingsReport {
            source: "listings",
            statuses,
            count: items.len(),
            tally: MarketTally::from_pairs(items.iter().map(|i| (i.make(), i.model()))),
        }
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Source: {} ({} records)", report.source, report.count);
    if !report.statuses.is_empty() {
        println!("HTTP statuses: {:?}", report.statuses);
    }
    if report.tally.is_empty() {
        println!("No market data");
        return Ok(());
    }

    println!("\nBrands:");
    for (make, count) in &report.tally.brands {
        println!("   {:<20} {}", make, count);
    }
    println!("\nModels:");
    for m in &report.tally.models {
        println!("   {:<20} {:<24} {}", m.make, m.model, m.count);
    }

    Ok(())
}

fn autodev_client(cli: &Cli) -> Result<AutoDevClient> {
    Ok(AutoDevClient::new(AutoDevConfig {
        api_key: cli.auto_dev_key.trim().to_string(),
        ..Default::default()
    })?)
}

async fn run_vin(cli: &Cli, vin: &str, decode: bool) -> Result<()> {
    let client = autodev_client(cli)?;
    if !client.has_key() {
        bail!("AUTO_DEV_API_KEY is not set");
    }

    let found = if decode {
        client
            .decode_vin(vin)
            .await
            .map(|d| serde_json::to_value(d))
            .transpose()?
    } else {
        client
            .fetch_listing_by_vin(vin)
            .await
            .map(|item| serde_json::to_value(item))
            .transpose()?
    };

    match found {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("No result for {}", vin),
    }

    Ok(())
}

mod artifact;
mod config;
mod extract;
mod fetch;
mod frame;
mod load;
mod pipeline;
mod schema;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::load::LoadMode;
use crate::pipeline::{Pipeline, RunOptions, RunSummary, TracingReporter};

/// activity-etl — extracts activity data (repos, commits, PRs, reviews) from
/// an analytics API into Parquet artifacts and loads them into DuckDB.
#[derive(Parser, Debug)]
#[command(name = "activity-etl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract all entities from the API into Parquet artifacts
    Extract(ExtractArgs),
    /// Load Parquet artifacts into the DuckDB store
    Load(LoadArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Base URL for the analytics API (e.g., http://localhost:8080)
    #[arg(long)]
    url: String,

    /// Output directory for Parquet artifacts
    #[arg(long, default_value = "data/raw")]
    output: PathBuf,

    /// API key for basic authentication (defaults to the fixed dev key or
    /// the value configured in .activity-etl.toml)
    #[arg(long)]
    api_key: Option<String>,

    /// Start date filter for commits (e.g., "90d", "2025-01-01")
    #[arg(long, default_value = "90d")]
    start_date: String,

    /// Continue extraction when a step fails, writing an empty artifact for
    /// it instead of aborting
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Directory containing Parquet artifacts
    #[arg(long, default_value = "data/raw")]
    parquet_dir: PathBuf,

    /// Path to the DuckDB database file
    #[arg(long, default_value = "data/analytics.duckdb")]
    db_path: PathBuf,

    /// Append to existing tables instead of replacing them
    #[arg(long)]
    incremental: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Extract(args) => run_extract(args).await,
        Command::Load(args) => run_load(args),
    }
}

async fn run_extract(args: ExtractArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::load()?;
    let api_key = args.api_key.clone().unwrap_or_else(|| config.api_key());

    info!(url = %args.url, output = %args.output.display(), "starting extraction");
    let client = fetch::Client::new(&args.url, &api_key);
    let reporter = TracingReporter;
    let pipeline = Pipeline::new(&client, &reporter);

    let summary = pipeline
        .run(&RunOptions {
            output_dir: args.output.clone(),
            start_date: args.start_date,
            continue_on_error: args.continue_on_error,
        })
        .await?;

    print_extract_summary(&summary);
    info!(output = %args.output.display(), "done");
    Ok(())
}

fn run_load(args: LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if args.incremental {
        LoadMode::Incremental
    } else {
        LoadMode::FullRefresh
    };

    info!(dir = %args.parquet_dir.display(), db = %args.db_path.display(), ?mode, "starting load");
    let summary = load::load_dir(&args.parquet_dir, &args.db_path, mode)?;

    println!();
    for table in &summary.tables {
        println!("  raw.{:<16} {} rows", table.name, table.rows);
    }
    println!(
        "{} loaded {} tables into {}",
        "OK".green().bold(),
        summary.tables.len(),
        args.db_path.display()
    );
    Ok(())
}

fn print_extract_summary(summary: &RunSummary) {
    println!();
    for (step, outcome) in summary.steps() {
        if outcome.failed {
            println!("  {:<16} {}", step.artifact(), "FAILED".red().bold());
        } else {
            println!("  {:<16} {} rows", step.artifact(), outcome.rows);
        }
    }
    println!();
}

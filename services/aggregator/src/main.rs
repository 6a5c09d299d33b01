use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use aggregator::config::AggregatorConfig;
use aggregator::export::CsvExporter;
use aggregator::feed::JsonLinesFeed;
use aggregator::pipeline::Aggregator;
use aggregator::store::JsonLinesStore;

#[derive(Parser)]
#[command(name = "aggregator", version, about = "Per-minute market data aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reduce a feed into per-minute collections
    Aggregate {
        #[arg(long)]
        config: PathBuf,
        /// Truncate existing collections instead of appending
        #[arg(long)]
        drop: bool,
    },
    /// Join stored collections into a CSV table
    Export {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Aggregate { config, drop } => aggregate(&config, drop),
        Command::Export { config, output } => export(&config, &output),
    }
}

fn aggregate(config_path: &Path, drop: bool) -> Result<()> {
    let config = AggregatorConfig::load(config_path)?;
    info!(
        version = aggregator::SERVICE_VERSION,
        collection = %config.collection,
        input = %config.input.display(),
        "Starting aggregator"
    );

    let feed = JsonLinesFeed::open(&config.input)
        .with_context(|| format!("opening feed {}", config.input.display()))?;
    let store = JsonLinesStore::open(&config.output_dir, &config.collection, drop)?;

    let mut aggregator =
        Aggregator::new(feed, store, config.max_depth, config.percentage_interval)?
            .with_progress_every(config.progress_every);
    let stats = aggregator.run()?;

    info!(
        records = stats.records_written,
        skipped = stats.profiles_skipped
            + stats.empty_windows_skipped
            + stats.batches_rejected
            + stats.overflow_skipped,
        "Done"
    );
    Ok(())
}

fn export(config_path: &Path, output: &Path) -> Result<()> {
    let config = AggregatorConfig::load(config_path)?;
    let records = JsonLinesStore::load(&config.output_dir, &config.collection)?;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let rows = CsvExporter::new(config.near_buckets).export(&records, BufWriter::new(file))?;

    info!(rows, output = %output.display(), "Export written");
    Ok(())
}

//! filer - regulatory filing entity resolution
//!
//! Reads a raw filing dump (JSON array, one object per submission) and writes
//! the resolved companies/filings tables plus a run report.

mod stats;

use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use filer_core::{Resolution, Resolver, ResolverConfig};
use tracing_subscriber::EnvFilter;

use stats::RunStats;

/// Resolve regulatory filing records into deduplicated companies.
#[derive(Parser)]
#[command(name = "filer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a raw filing dump into companies and filings.
    Resolve {
        /// Raw filing dump (JSON array).
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the output files.
        #[arg(short, long, default_value = "structured")]
        out_dir: PathBuf,

        /// Override the fuzzy similarity threshold.
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Keep filers classified as individuals, flagged by entity type.
        #[arg(long)]
        keep_individuals: bool,

        /// Validation-stats history file (default: <out-dir>/validation_stats.json).
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Print the normalized key and entity type of each name.
    Normalize {
        /// Raw filer names.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve {
            input,
            out_dir,
            threshold,
            keep_individuals,
            stats,
        } => {
            let mut config = config;
            if let Some(threshold) = threshold {
                config.matching.similarity_threshold = threshold;
            }
            if keep_individuals {
                config.classification.exclude_individuals = false;
            }
            let stats_path = stats.unwrap_or_else(|| out_dir.join("validation_stats.json"));
            run_resolve(config, &input, &out_dir, &stats_path)
        }
        Commands::Normalize { names } => run_normalize(config, &names),
        Commands::Config => run_config(config),
    }
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let config = ResolverConfig::from_toml(&text)?;
            tracing::debug!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        None => Ok(ResolverConfig::default()),
    }
}

fn run_resolve(
    config: ResolverConfig,
    input: &Path,
    out_dir: &Path,
    stats_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let resolver = Resolver::new(config)?;

    tracing::info!("Reading filings from {:?}", input);
    let json = fs::read_to_string(input)?;
    let resolution = resolver.resolve_json(&json)?;

    fs::create_dir_all(out_dir)?;
    write_outputs(&resolution, out_dir)?;

    let run = RunStats::from_report(input, &resolution.report);
    let history_len = stats::append_history(stats_path, &run)?;
    tracing::debug!("Stats history {:?} now has {} runs", stats_path, history_len);

    let counts = &resolution.report.counts;
    println!(
        "{} records -> {} in proceeding -> {} included -> {} companies, {} filings ({} merges)",
        counts.raw,
        counts.raw - counts.out_of_proceeding,
        counts.included,
        counts.companies,
        counts.filings,
        resolution.report.decisions.len()
    );
    if resolution.report.has_warnings() {
        println!(
            "warnings: {} malformed, {} unclassified, {} validation issues (see resolution_report.json)",
            counts.malformed,
            counts.unclassified,
            resolution.report.validation_issues.len()
        );
    }
    println!("Wrote output to {}", out_dir.display());

    Ok(())
}

fn write_outputs(resolution: &Resolution, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let dataset = &resolution.dataset;

    dataset.write_companies_csv(create(out_dir, "companies.csv")?)?;
    dataset.write_filings_csv(create(out_dir, "filings.csv")?)?;
    dataset.write_nested_json(
        create(out_dir, "companies_with_filings.json")?,
        &Default::default(),
    )?;

    let mut manifest = create(out_dir, "document_manifest.json")?;
    serde_json::to_writer_pretty(&mut manifest, &dataset.document_manifest())?;
    manifest.flush()?;

    let mut report = create(out_dir, "resolution_report.json")?;
    serde_json::to_writer_pretty(&mut report, &resolution.report)?;
    report.flush()?;

    Ok(())
}

fn create(dir: &Path, name: &str) -> std::io::Result<BufWriter<File>> {
    let path = dir.join(name);
    tracing::debug!("Writing {:?}", path);
    Ok(BufWriter::new(File::create(path)?))
}

fn run_normalize(config: ResolverConfig, names: &[String]) -> Result<(), Box<dyn Error>> {
    let resolver = Resolver::new(config)?;
    for name in names {
        println!(
            "{}\t{}\t{}",
            name,
            resolver.normalize(name),
            resolver.classify(name)
        );
    }
    Ok(())
}

fn run_config(config: ResolverConfig) -> Result<(), Box<dyn Error>> {
    config.validate()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

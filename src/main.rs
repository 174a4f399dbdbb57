//! issnlister main entry point
//!
//! This is the command-line interface for harvesting the ISSN registry.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use issnlister::config::{load_config_with_hash, validate, Config};
use issnlister::harvest::{build_http_client, Harvester, IgnoreSource};
use issnlister::output::{validate_line, write_check_report, write_mapping};
use issnlister::storage::lines_from_reader;
use issnlister::{CacheEpoch, SitemapCache};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// issnlister: list and harvest ISSN registry records
///
/// The identifier list is derived from the public sitemap of the ISSN portal
/// and cached per day. Record metadata is fetched as JSON, one document per
/// line.
#[derive(Parser, Debug)]
#[command(name = "issnlister")]
#[command(version)]
#[command(about = "List and harvest ISSN registry records", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cache directory, one subdirectory per day
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Sitemap index URL
    #[arg(long, global = true, value_name = "URL")]
    sitemap: Option<String>,

    /// Name sent in the User-Agent header
    #[arg(long, global = true, value_name = "NAME")]
    user_agent: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print all registered ISSN, one per line
    List,

    /// Download the JSON metadata of every ISSN to standard output
    Dump(DumpArgs),

    /// Report whether ISSN are registered (reads standard input without arguments)
    Check {
        /// ISSN to check, with or without hyphen
        issns: Vec<String>,
    },

    /// Verify check digits, or compute one for seven digits (reads standard input without arguments)
    Validate {
        /// ISSN or seven digit serials
        issns: Vec<String>,
    },

    /// Print ISSN and ISSN-L pairs from a dump
    Mapping {
        /// Newline delimited JSON dump
        #[arg(value_name = "DUMP")]
        dump: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Skip the ISSN listed in this file
    #[arg(long, value_name = "FILE", conflicts_with = "resume")]
    ignore_file: Option<PathBuf>,

    /// Repair an interrupted dump and append the missing records to it
    #[arg(long = "continue", value_name = "FILE")]
    resume: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Links per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Log and skip records that are not valid JSON instead of retrying
    #[arg(long)]
    skip_undecodable: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let epoch = CacheEpoch::today(&config.cache.directory);
    tracing::debug!("Cache directory: {}", epoch.dir().display());

    match cli.command {
        Command::List => handle_list(&config, epoch).await,
        Command::Dump(ref args) => handle_dump(&config, epoch, args).await,
        Command::Check { ref issns } => handle_check(&config, epoch, issns).await,
        Command::Validate { ref issns } => handle_validate(issns),
        Command::Mapping { ref dump } => handle_mapping(dump),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to standard error; standard output carries data only.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("issnlister=info,warn"),
            1 => EnvFilter::new("issnlister=debug,info"),
            _ => EnvFilter::new("issnlister=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the optional config file and applies command line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(dir) = &cli.cache_dir {
        config.cache.directory = dir.clone();
    }
    if let Some(url) = &cli.sitemap {
        config.cache.sitemap_index = url.clone();
    }
    if let Some(name) = &cli.user_agent {
        config.user_agent.name = name.clone();
    }
    if let Command::Dump(args) = &cli.command {
        if let Some(workers) = args.workers {
            config.harvest.workers = workers;
        }
        if let Some(batch_size) = args.batch_size {
            config.harvest.batch_size = batch_size;
        }
        if args.skip_undecodable {
            config.harvest.skip_undecodable = true;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn sitemap_cache(config: &Config, epoch: CacheEpoch) -> anyhow::Result<SitemapCache> {
    let client = build_http_client(&config.user_agent).context("Failed to build HTTP client")?;
    Ok(SitemapCache::with_client(client, config, epoch))
}

/// Reads identifiers from the arguments, or from standard input when there are none
fn inputs_or_stdin(args: &[String]) -> anyhow::Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(args.to_vec());
    }
    let stdin = std::io::stdin();
    lines_from_reader(stdin.lock()).context("Failed to read standard input")
}

/// Handles `list`: prints the cached identifier list
async fn handle_list(config: &Config, epoch: CacheEpoch) -> anyhow::Result<()> {
    let cache = sitemap_cache(config, epoch)?;
    let list = cache.list().await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for issn in list {
        writeln!(out, "{}", issn)?;
    }
    out.flush()?;
    Ok(())
}

/// Handles `dump`: fetches every record not yet harvested
async fn handle_dump(config: &Config, epoch: CacheEpoch, args: &DumpArgs) -> anyhow::Result<()> {
    let source = IgnoreSource::from_options(args.ignore_file.clone(), args.resume.clone())?;
    let harvester = Harvester::new(config, epoch)?;

    match harvester.dump(&source).await {
        Ok(stats) => {
            tracing::info!(
                "Dump completed: {} records from {} links in {} batches",
                stats.lines,
                stats.items,
                stats.batches
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Dump failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles `check`: reports registration status against today's catalog
async fn handle_check(config: &Config, epoch: CacheEpoch, issns: &[String]) -> anyhow::Result<()> {
    let inputs = inputs_or_stdin(issns)?;
    let cache = sitemap_cache(config, epoch)?;
    let known = cache.snapshot().await?;

    let stdout = std::io::stdout();
    let summary = write_check_report(&inputs, &known, &mut stdout.lock())?;
    tracing::info!(
        "{} registered, {} not found, {} invalid",
        summary.registered,
        summary.not_found,
        summary.invalid
    );
    Ok(())
}

/// Handles `validate`: check digit report
fn handle_validate(issns: &[String]) -> anyhow::Result<()> {
    let inputs = inputs_or_stdin(issns)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for raw in &inputs {
        match validate_line(raw) {
            Ok(line) => writeln!(out, "{}", line)?,
            Err(e) => tracing::warn!("{}", e),
        }
    }
    out.flush()?;
    Ok(())
}

/// Handles `mapping`: ISSN to ISSN-L pairs from a dump
fn handle_mapping(dump: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(dump)
        .with_context(|| format!("Failed to open {}", dump.display()))?;

    let stdout = std::io::stdout();
    let stats = write_mapping(BufReader::new(file), &mut stdout.lock())?;
    tracing::info!("{} pairs written, {} lines skipped", stats.written, stats.skipped);
    Ok(())
}

//! bidsreports - methods sections for BIDS datasets
//!
//! A CLI tool that reads sidecar metadata and image headers of a BIDS
//! dataset and writes a draft description of the MRI acquisition protocol.
//!
//! Exit codes:
//!   0 - Success (including datasets where no pattern was found)
//!   1 - Runtime error (unreadable dataset, bad config, invalid metadata, etc.)

use anyhow::{Context, Result};
use bidsreports::cli::{self, Args, OutputFormat};
use bidsreports::config::{self, Config, ConverterSource, Converters};
use bidsreports::image::NiftiLoader;
use bidsreports::layout::{DirLayout, Filter, Layout, LayoutConfig, Query};
use bidsreports::report::{self, BidsReport, Renderer};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.general.verbosity);

    info!("bidsreports v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_report(&args, &config) {
        error!("Report generation failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Handle --init-config: generate a default .bidsreports.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to customize the output file, excluded directories, and converters.");
    Ok(())
}

/// Initialize logging for a 0-3 verbosity.
fn init_logging(verbosity: u8) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli::log_level(verbosity))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Index the dataset, generate the report, and write it to the output directory.
fn run_report(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    let bids_dir = args
        .bids_dir
        .as_deref()
        .context("BIDS_DIR is required")?;
    let output_dir = args
        .output_dir
        .as_deref()
        .context("OUTPUT_DIR is required")?;

    let layout = DirLayout::index(bids_dir, &LayoutConfig::from(&config.layout))
        .with_context(|| format!("Failed to index dataset at {}", bids_dir.display()))?;
    info!(
        "Indexed {} files under {}",
        layout.files().len(),
        bids_dir.display()
    );

    let source = match config.report.converters {
        Some(ref path) => ConverterSource::Path(path.clone()),
        None => ConverterSource::Bundled,
    };
    let converters = Converters::load(source).context("Failed to load converters")?;

    let renderer = match config.report.templates_dir {
        Some(ref dir) => Renderer::from_dir(dir).context("Failed to load templates")?,
        None => Renderer::bundled(),
    };

    let query = build_query(args);
    let nb_subjects = layout.subjects(&query).len();

    let bids = BidsReport::new(layout, NiftiLoader, converters)
        .with_renderer(renderer)
        .with_extensions(config.layout.extensions.clone());

    let progress = ProgressBar::new(nb_subjects as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let counter = bids.generate_with(&query, |subject| {
        progress.set_message(format!("sub-{}", subject));
        progress.inc(1);
    });
    progress.finish_and_clear();
    let counter = counter.context("Failed to generate report")?;

    let (content, file_name) = match config.general.format {
        OutputFormat::Text => match report::generate_text_report(&counter) {
            Some(text) => (text, PathBuf::from(&config.general.output_file)),
            None => {
                warn!("No common patterns found.");
                return Ok(());
            }
        },
        OutputFormat::Json => {
            if counter.is_empty() {
                warn!("No common patterns found.");
                return Ok(());
            }
            let json = report::generate_json_report(&counter, Utc::now())?;
            (
                json,
                PathBuf::from(&config.general.output_file).with_extension("json"),
            )
        }
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let output = output_dir.join(file_name);
    report::write_report(&content, &output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    println!("Patterns detected: {}", counter.len());
    println!("Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("Report saved to: {}", output.display());
    Ok(())
}

/// Dataset filters from the participant and session flags.
fn build_query(args: &Args) -> Query {
    let mut query = Query::new();
    if let Some(ref labels) = args.participant_label {
        query.set("subject", Filter::OneOf(labels.clone()));
    }
    if let Some(ref sessions) = args.session {
        query.set("session", Filter::OneOf(sessions.clone()));
    }
    query
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: failed to load {}: {:#}", config::CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

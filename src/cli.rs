//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// bidsreports - methods sections for BIDS datasets
///
/// Reads the metadata and image headers of a BIDS dataset and writes a
/// draft "MRI acquisition" paragraph describing the most common protocol.
///
/// Examples:
///   bidsreports /data/ds000001 /tmp/out
///   bidsreports /data/ds000001 /tmp/out --participant-label 01 02
///   bidsreports /data/ds000001 /tmp/out --session 01 --format json
///   bidsreports --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// The directory with the input dataset formatted according to the BIDS standard
    #[arg(value_name = "BIDS_DIR", required_unless_present = "init_config")]
    pub bids_dir: Option<PathBuf>,

    /// The directory where the report should be stored
    #[arg(value_name = "OUTPUT_DIR", required_unless_present = "init_config")]
    pub output_dir: Option<PathBuf>,

    /// Participant labels to include, without the "sub-" prefix
    ///
    /// When omitted every participant in the dataset is described.
    #[arg(long, value_name = "LABEL", num_args = 1..)]
    pub participant_label: Option<Vec<String>>,

    /// Session labels to include, without the "ses-" prefix
    #[arg(long, value_name = "LABEL", num_args = 1..)]
    pub session: Option<Vec<String>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .bidsreports.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON file mapping DICOM codes to prose (keys: dir, seq, seqvar)
    #[arg(long, value_name = "FILE", env = "BIDSREPORTS_CONVERTERS")]
    pub converters: Option<PathBuf>,

    /// Directory of *.mustache templates overriding the bundled ones
    #[arg(long, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Directory names to skip while indexing (comma-separated)
    ///
    /// Example: --exclude derivatives,sourcedata
    #[arg(long, value_name = "DIRS", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Verbosity: 0 errors, 1 warnings, 2 info, 3 debug
    #[arg(short, long, value_name = "LEVEL")]
    pub verbosity: Option<u8>,

    /// Generate a default .bidsreports.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Most common report as plain text (default)
    #[default]
    Text,
    /// Every pattern with its count
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        let bids_dir = match self.bids_dir {
            Some(ref dir) => dir,
            None => return Err("BIDS_DIR is required".to_string()),
        };
        if !bids_dir.is_dir() {
            return Err(format!(
                "BIDS directory does not exist: {}",
                bids_dir.display()
            ));
        }

        if self.output_dir.is_none() {
            return Err("OUTPUT_DIR is required".to_string());
        }

        if let Some(verbosity) = self.verbosity {
            if verbosity > 3 {
                return Err("Verbosity must be between 0 and 3".to_string());
            }
        }

        for label in self.participant_label.iter().flatten() {
            if label.starts_with("sub-") {
                return Err(format!(
                    "Participant label '{}' must not include the 'sub-' prefix",
                    label
                ));
            }
        }
        for label in self.session.iter().flatten() {
            if label.starts_with("ses-") {
                return Err(format!(
                    "Session label '{}' must not include the 'ses-' prefix",
                    label
                ));
            }
        }

        Ok(())
    }
}

/// Map a 0-3 verbosity to a log level.
pub fn log_level(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    }
}

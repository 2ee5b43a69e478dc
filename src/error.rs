//! Error types for report generation.
//!
//! Missing metadata is never an error here; these variants cover contract
//! violations and conditions that must abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A list join was requested on an empty list.
    #[error("List of length 0 provided.")]
    EmptyList,

    /// Slice timing produced a permutation that fits no known order.
    #[error("Unknown slice order: [{0}]")]
    SliceOrder(String),

    /// The converters document does not have the `dir`/`seq`/`seqvar` shape.
    #[error("Invalid converters config: {0}")]
    Config(String),

    /// A file the report depends on could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No imaging data exists for a requested subject/session pair.
    #[error("No imaging files for subject {subject}{}", session_suffix(.session))]
    NoImagingFiles {
        subject: String,
        session: Option<String>,
    },

    /// The dataset directory could not be indexed.
    #[error("Failed to index dataset at {path}: {message}")]
    Index { path: PathBuf, message: String },
}

fn session_suffix(session: &Option<String>) -> String {
    match session {
        Some(ses) => format!(" in session {}", ses),
        None => String::new(),
    }
}

/// Result alias used across the report library.
pub type Result<T> = std::result::Result<T, ReportError>;

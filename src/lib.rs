//! bidsreports - methods sections for BIDS datasets
//!
//! Library side of the `bidsreports` tool: index a dataset, group its files
//! into acquisitions, describe each subject, and count identical descriptions.
//!
//! ```no_run
//! use bidsreports::config::Converters;
//! use bidsreports::image::NiftiLoader;
//! use bidsreports::layout::{DirLayout, LayoutConfig, Query};
//! use bidsreports::report::BidsReport;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let layout = DirLayout::index(Path::new("/data/ds000117"), &LayoutConfig::default())?;
//! let bids = BidsReport::new(layout, NiftiLoader, Converters::bundled()?);
//! let counter = bids.generate(&Query::new())?;
//! if let Some(text) = bidsreports::report::generate_text_report(&counter) {
//!     println!("{}", text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod layout;
pub mod models;
pub mod parameters;
pub mod report;
#[cfg(test)]
mod testing;
pub mod utils;

pub use error::{ReportError, Result};
pub use report::BidsReport;

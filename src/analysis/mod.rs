//! Analysis modules.
//!
//! Grouping of files into acquisitions and counting of the resulting
//! per-subject reports.

pub mod consensus;
pub mod grouping;

pub use consensus::{Pattern, ProtocolCounter};
pub use grouping::collect_associated_files;

//! Report generation modules.

pub mod generator;
pub mod parsing;
pub mod templates;

pub use generator::{generate_json_report, generate_text_report, write_report, BidsReport};
pub use templates::Renderer;

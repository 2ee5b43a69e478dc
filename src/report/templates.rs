//! Mustache-style paragraph templates.
//!
//! Only plain `{{ tag }}` substitution is supported. A tag with no value in
//! the description bag is left in the output as-is so that a reader can see
//! which fields could not be resolved.

use crate::error::{ReportError, Result};
use crate::models::DescriptionData;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Which paragraph template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TemplateId {
    Func,
    Anat,
    Dwi,
    Fmap,
}

impl TemplateId {
    pub const ALL: [TemplateId; 4] = [
        TemplateId::Func,
        TemplateId::Anat,
        TemplateId::Dwi,
        TemplateId::Fmap,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateId::Func => "func.mustache",
            TemplateId::Anat => "anat.mustache",
            TemplateId::Dwi => "dwi.mustache",
            TemplateId::Fmap => "fmap.mustache",
        }
    }

    fn bundled(&self) -> &'static str {
        match self {
            TemplateId::Func => include_str!("../../assets/templates/func.mustache"),
            TemplateId::Anat => include_str!("../../assets/templates/anat.mustache"),
            TemplateId::Dwi => include_str!("../../assets/templates/dwi.mustache"),
            TemplateId::Fmap => include_str!("../../assets/templates/fmap.mustache"),
        }
    }
}

/// Renders description bags into prose.
#[derive(Debug, Clone)]
pub struct Renderer {
    templates: BTreeMap<TemplateId, String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::bundled()
    }
}

impl Renderer {
    /// Templates shipped with the tool.
    pub fn bundled() -> Self {
        Self {
            templates: TemplateId::ALL
                .iter()
                .map(|id| (*id, id.bundled().to_string()))
                .collect(),
        }
    }

    /// Bundled templates, replaced by any `*.mustache` of the same name in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ReportError::Config(format!(
                "templates directory not found: {}",
                dir.display()
            )));
        }

        let mut renderer = Self::bundled();
        for id in TemplateId::ALL {
            let path = dir.join(id.file_name());
            if !path.is_file() {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|source| ReportError::Io {
                path: path.clone(),
                source,
            })?;
            debug!("Using template override {}", path.display());
            renderer.templates.insert(id, content);
        }
        Ok(renderer)
    }

    pub fn render(&self, id: TemplateId, data: &DescriptionData) -> String {
        let template = self
            .templates
            .get(&id)
            .map(String::as_str)
            .unwrap_or_else(|| id.bundled());

        let filled = tag_regex().replace_all(template, |caps: &Captures| {
            data.get(&caps[1])
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        });

        whitespace_regex()
            .replace_all(filled.trim(), " ")
            .into_owned()
    }
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static regex is valid"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

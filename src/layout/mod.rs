//! Dataset query layer.
//!
//! `Layout` is the seam between the report engine and a BIDS dataset: it
//! lists files matching entity filters and returns their sidecar metadata.

pub mod filesystem;

pub use filesystem::{DirLayout, LayoutConfig};

use crate::models::{BidsFile, Entities, Metadata};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

/// Extensions of data files the report describes.
pub const SUPPORTED_EXTENSIONS: [&str; 7] =
    [".nii", ".nii.gz", ".set", ".fif", ".edf", ".bdf", ".snirf"];

/// Extensions handled by the image decoder.
pub const NIFTI_EXTENSIONS: [&str; 2] = [".nii", ".nii.gz"];

/// Directory names that carry a datatype.
const DATATYPES: [&str; 14] = [
    "anat", "func", "dwi", "fmap", "perf", "eeg", "meg", "ieeg", "beh", "pet", "micr", "nirs",
    "motion", "microscopy",
];

/// Constraint on a single entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Is(String),
    OneOf(Vec<String>),
}

impl Filter {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Filter::Is(v) => v == value,
            Filter::OneOf(values) => values.iter().any(|v| v == value),
        }
    }

    /// Values named by the filter, in order.
    pub fn values(&self) -> Vec<String> {
        match self {
            Filter::Is(v) => vec![v.clone()],
            Filter::OneOf(values) => values.clone(),
        }
    }
}

/// Entity filters for a dataset query. Unlisted entities are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: BTreeMap<String, Filter>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `entity == value`.
    pub fn is(mut self, entity: &str, value: impl Into<String>) -> Self {
        self.filters
            .insert(entity.to_string(), Filter::Is(value.into()));
        self
    }

    /// Require `entity` to be one of `values`.
    pub fn one_of<I, S>(mut self, entity: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters
            .insert(entity.to_string(), Filter::OneOf(values));
        self
    }

    pub fn set(&mut self, entity: &str, filter: Filter) {
        self.filters.insert(entity.to_string(), filter);
    }

    pub fn get(&self, entity: &str) -> Option<&Filter> {
        self.filters.get(entity)
    }

    /// Remove and return the filter on `entity`.
    pub fn take(&mut self, entity: &str) -> Option<Filter> {
        self.filters.remove(entity)
    }

    /// Copy of this query without the filter on `entity`.
    pub fn without(&self, entity: &str) -> Self {
        let mut query = self.clone();
        query.filters.remove(entity);
        query
    }

    /// Whether every filter is satisfied. A filtered entity the file lacks fails.
    pub fn matches(&self, file: &BidsFile) -> bool {
        self.filters.iter().all(|(entity, filter)| {
            file.entity(entity)
                .map(|value| filter.matches(value))
                .unwrap_or(false)
        })
    }
}

/// Read access to an indexed dataset.
pub trait Layout {
    /// Dataset root directory.
    fn root(&self) -> &Path;

    /// Every indexed file, sorted by path.
    fn files(&self) -> &[BidsFile];

    /// Merged sidecar metadata for a data file; empty when none exists.
    fn metadata(&self, path: &Path) -> Metadata;

    /// Files matching `query`, in index order.
    fn get(&self, query: &Query) -> Vec<BidsFile> {
        self.files()
            .iter()
            .filter(|f| query.matches(f))
            .cloned()
            .collect()
    }

    /// Sorted distinct subject labels among files matching `query`.
    fn subjects(&self, query: &Query) -> Vec<String> {
        self.distinct("subject", query)
    }

    /// Sorted distinct session labels among files matching `query`.
    fn sessions(&self, query: &Query) -> Vec<String> {
        self.distinct("session", query)
    }

    /// Sorted distinct values of `entity` among files matching `query`.
    fn distinct(&self, entity: &str, query: &Query) -> Vec<String> {
        self.files()
            .iter()
            .filter(|f| query.matches(f))
            .filter_map(|f| f.entity(entity).map(String::from))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn entity_name(key: &str) -> &str {
    match key {
        "sub" => "subject",
        "ses" => "session",
        "acq" => "acquisition",
        "ce" => "ceagent",
        "rec" => "reconstruction",
        "dir" => "direction",
        "mod" => "modality",
        "inv" => "inversion",
        "proc" => "processing",
        "res" => "resolution",
        "den" => "density",
        "trc" => "tracer",
        "ch" => "channel",
        other => other,
    }
}

fn bids_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^((?:[a-zA-Z0-9]+-[a-zA-Z0-9]+_)*)([a-zA-Z0-9]+)((?:\.[a-zA-Z0-9]+)+)?$")
            .expect("static regex is valid")
    })
}

/// Parse a BIDS file path into its entities.
///
/// Returns `None` for names that are not `key-value_..._suffix.ext`.
pub fn parse_entities(path: &Path) -> Option<Entities> {
    let name = path.file_name()?.to_str()?;
    let caps = bids_name_regex().captures(name)?;

    let mut entities = Entities::new();
    if let Some(pairs) = caps.get(1) {
        for pair in pairs.as_str().split('_').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('-')?;
            entities.insert(entity_name(key).to_string(), value.to_string());
        }
    }
    entities.insert("suffix".to_string(), caps[2].to_string());
    if let Some(ext) = caps.get(3) {
        entities.insert("extension".to_string(), ext.as_str().to_string());
    }

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());
    if let Some(datatype) = parent.filter(|p| DATATYPES.contains(p)) {
        entities.insert("datatype".to_string(), datatype.to_string());
    }

    Some(entities)
}

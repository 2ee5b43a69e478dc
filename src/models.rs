//! Data models for report generation.
//!
//! This module contains the core data structures used throughout the
//! application: dataset files and their entities, sidecar metadata,
//! decoded image geometry, and the per-group description bag.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder rendered wherever a value could not be determined.
pub const UNKNOWN: &str = "UNKNOWN";

/// Entity name -> value for one file (`subject`, `session`, `run`, `suffix`, ...).
pub type Entities = BTreeMap<String, String>;

/// One acquired data file in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BidsFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Parsed entities, including `suffix`, `extension` and `datatype`.
    pub entities: Entities,
}

impl BidsFile {
    pub fn new(path: PathBuf, entities: Entities) -> Self {
        Self { path, entities }
    }

    /// Value of a single entity.
    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }

    pub fn suffix(&self) -> &str {
        self.entity("suffix").unwrap_or("")
    }

    pub fn datatype(&self) -> &str {
        self.entity("datatype").unwrap_or("")
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Path relative to `root`, or the full path when it lies elsewhere.
    pub fn relative_to(&self, root: &Path) -> PathBuf {
        self.path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.path.clone())
    }
}

/// A sequence-code style metadata value: either `"SE_EP"` or `["SE", "EP"]`.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeList {
    Scalar(String),
    List(Vec<String>),
}

impl CodeList {
    /// Normalize into individual codes; scalars split on `_`.
    pub fn into_codes(self) -> Vec<String> {
        match self {
            CodeList::Scalar(s) => s.split('_').map(String::from).collect(),
            CodeList::List(items) => items,
        }
    }
}

/// Sidecar metadata for one file. Absent keys are the normal case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; any other JSON value yields empty metadata.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map.into_iter().collect()),
            _ => Self::default(),
        }
    }

    /// Overlay `other` on top of `self`, key by key.
    pub fn merge(&mut self, other: Metadata) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Numeric array such as `SliceTiming`.
    pub fn f64_list(&self, key: &str) -> Option<Vec<f64>> {
        self.get(key)?
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
    }

    /// String or list of strings, e.g. `IntendedFor`.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Sequence-code value (`ScanningSequence`, `SequenceVariant`).
    pub fn codes(&self, key: &str) -> Option<CodeList> {
        match self.get(key)? {
            Value::String(s) => Some(CodeList::Scalar(s.clone())),
            Value::Array(items) => Some(CodeList::List(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Scalar entries rendered as text, for copying into a description bag.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.0.iter().filter_map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.as_str(), text))
        })
    }
}

/// Decoded geometry of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    /// Extent along each axis (x, y, z, t, ...).
    pub shape: Vec<usize>,
    /// Voxel size along each axis, in the header's spatial/temporal units.
    pub zooms: Vec<f64>,
}

impl ImageHeader {
    pub fn new(shape: Vec<usize>, zooms: Vec<f64>) -> Self {
        Self { shape, zooms }
    }

    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.shape.get(axis).copied()
    }

    /// Number of volumes; a 3D image counts as one.
    pub fn volumes(&self) -> usize {
        self.dim(3).unwrap_or(1)
    }
}

/// Number of volumes across the files of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeCount {
    Single(usize),
    Range { min: usize, max: usize },
}

impl fmt::Display for VolumeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeCount::Single(n) => write!(f, "{}", n),
            VolumeCount::Range { min, max } => write!(f, "{}-{}", min, max),
        }
    }
}

/// Which paragraph an acquisition group is described by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanKind {
    Functional,
    Anatomical,
    Diffusion,
    Fieldmap,
    /// Skipped with a warning naming the datatype or file.
    Unsupported(String),
}

const ANAT_SUFFIXES: [&str; 9] = [
    "T1w",
    "T2w",
    "PDw",
    "T2starw",
    "FLAIR",
    "inplaneT1",
    "inplaneT2",
    "PDT2",
    "angio",
];

const UNSUPPORTED_DATATYPES: [&str; 8] = [
    "eeg",
    "meg",
    "pet",
    "ieeg",
    "beh",
    "perf",
    "fnirs",
    "microscopy",
];

impl ScanKind {
    /// Classify a group by its first file. First match wins.
    pub fn classify(file: &BidsFile) -> Self {
        let datatype = file.datatype();
        let suffix = file.suffix();

        match datatype {
            "func" => ScanKind::Functional,
            "anat" if ANAT_SUFFIXES.contains(&suffix) => ScanKind::Anatomical,
            "dwi" => ScanKind::Diffusion,
            "fmap" if suffix == "phasediff" => ScanKind::Fieldmap,
            dt if UNSUPPORTED_DATATYPES.contains(&dt) => ScanKind::Unsupported(dt.to_string()),
            _ => ScanKind::Unsupported(file.filename()),
        }
    }
}

/// Semantic field name -> prose for one acquisition group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptionData(BTreeMap<String, String>);

impl DescriptionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the scalar metadata values, keyed by their original names.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self(
            metadata
                .scalars()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

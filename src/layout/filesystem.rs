//! Filesystem-backed dataset index.
//!
//! Walks a BIDS directory once, parses every BIDS-named file into entities
//! and answers queries from that in-memory index. Sidecar metadata is read
//! on demand following the inheritance principle.

use super::{parse_entities, Layout};
use crate::error::{ReportError, Result};
use crate::models::{BidsFile, Metadata};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Directory names skipped while indexing.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec!["derivatives", "sourcedata", "code", "stimuli"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// A BIDS dataset indexed from disk.
#[derive(Debug, Clone)]
pub struct DirLayout {
    root: PathBuf,
    files: Vec<BidsFile>,
}

impl DirLayout {
    /// Index every BIDS-named file under `root`.
    pub fn index(root: &Path, config: &LayoutConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(ReportError::Index {
                path: root.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry.file_name(), config));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            match parse_entities(&path) {
                Some(entities) => files.push(BidsFile::new(path, entities)),
                None => debug!("Not a BIDS file name: {}", path.display()),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Indexed {} files under {}", files.len(), root.display());

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Sidecars that apply to `target`, shallowest first.
    fn sidecars_for(&self, target: &BidsFile) -> Vec<&BidsFile> {
        let target_dir = target.path.parent().unwrap_or(&self.root);

        let mut sidecars: Vec<&BidsFile> = self
            .files
            .iter()
            .filter(|f| f.entity("extension") == Some(".json"))
            .filter(|f| f.suffix() == target.suffix())
            .filter(|f| {
                f.path
                    .parent()
                    .map(|dir| target_dir.starts_with(dir))
                    .unwrap_or(false)
            })
            .filter(|f| {
                f.entities
                    .iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "extension" | "suffix" | "datatype"))
                    .all(|(k, v)| target.entity(k) == Some(v.as_str()))
            })
            .collect();

        sidecars.sort_by_key(|f| (f.path.components().count(), f.entities.len()));
        sidecars
    }
}

impl Layout for DirLayout {
    fn root(&self) -> &Path {
        &self.root
    }

    fn files(&self) -> &[BidsFile] {
        &self.files
    }

    fn metadata(&self, path: &Path) -> Metadata {
        let target = match self.files.iter().find(|f| f.path == path) {
            Some(f) => f,
            None => {
                debug!("No indexed file at {}", path.display());
                return Metadata::new();
            }
        };

        let mut metadata = Metadata::new();
        for sidecar in self.sidecars_for(target) {
            match read_sidecar(&sidecar.path) {
                Ok(layer) => metadata.merge(layer),
                Err(e) => warn!("Ignoring sidecar {}: {}", sidecar.path.display(), e),
            }
        }
        metadata
    }
}

fn read_sidecar(path: &Path) -> std::result::Result<Metadata, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    Ok(Metadata::from_json(value))
}

fn is_excluded(name: &std::ffi::OsStr, config: &LayoutConfig) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || config.exclude.iter().any(|pattern| name == pattern.as_str())
}

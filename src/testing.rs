//! Throw-away BIDS datasets for unit tests.

use crate::image::ImageLoader;
use crate::layout::{DirLayout, LayoutConfig};
use crate::models::ImageHeader;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A BIDS tree under a temporary directory.
pub struct Dataset {
    dir: TempDir,
}

impl Dataset {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("dataset_description.json"),
            r#"{"Name": "test", "BIDSVersion": "1.8.0"}"#,
        )
        .unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Placeholder image at `rel` plus a JSON sidecar next to it.
    pub fn image(&self, rel: &str, metadata: Value) -> PathBuf {
        let path = self.write(rel, "");
        let stem = rel
            .strip_suffix(".nii.gz")
            .or_else(|| rel.strip_suffix(".nii"))
            .unwrap_or(rel);
        self.write(&format!("{}.json", stem), &metadata.to_string());
        path
    }

    pub fn layout(&self) -> DirLayout {
        DirLayout::index(self.root(), &LayoutConfig::default()).unwrap()
    }
}

/// Image loader answering from a table keyed by file name.
#[derive(Default)]
pub struct StubLoader {
    headers: HashMap<String, ImageHeader>,
}

impl StubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filename: &str, header: ImageHeader) -> Self {
        self.headers.insert(filename.to_string(), header);
        self
    }
}

impl ImageLoader for StubLoader {
    fn try_load(&self, path: &Path) -> Option<ImageHeader> {
        let name = path.file_name()?.to_str()?;
        self.headers.get(name).cloned()
    }
}

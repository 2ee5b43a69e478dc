//! Configuration handling.
//!
//! Two documents live here: the `.bidsreports.toml` application settings,
//! and the JSON converters vocabulary that turns DICOM codes into prose.

use crate::cli::OutputFormat;
use crate::error::{ReportError, Result as ReportResult};
use crate::layout::{LayoutConfig, SUPPORTED_EXTENSIONS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default application config file name.
pub const CONFIG_FILE: &str = ".bidsreports.toml";

const BUNDLED_CONVERTERS: &str = include_str!("../assets/converters.json");

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset indexing settings.
    #[serde(default)]
    pub layout: DatasetConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file name, written inside the output directory.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Report format (text, json).
    #[serde(default)]
    pub format: OutputFormat,

    /// Logging verbosity, 0 (errors only) to 3 (debug).
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            format: OutputFormat::default(),
            verbosity: default_verbosity(),
        }
    }
}

fn default_output_file() -> String {
    "report.txt".to_string()
}

fn default_verbosity() -> u8 {
    2
}

/// Dataset indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Data file extensions described by the report.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped while indexing.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: default_exclude(),
        }
    }
}

impl From<&DatasetConfig> for LayoutConfig {
    fn from(config: &DatasetConfig) -> Self {
        Self {
            exclude: config.exclude.clone(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_exclude() -> Vec<String> {
    LayoutConfig::default().exclude
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Converters JSON file; the bundled vocabulary when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converters: Option<PathBuf>,

    /// Directory of `*.mustache` files overriding the bundled templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(verbosity) = args.verbosity {
            self.general.verbosity = verbosity;
        }
        if let Some(ref converters) = args.converters {
            self.report.converters = Some(converters.clone());
        }
        if let Some(ref templates) = args.templates_dir {
            self.report.templates_dir = Some(templates.clone());
        }
        if let Some(ref exclude) = args.exclude {
            self.layout.exclude = exclude.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Where the converters vocabulary comes from.
#[derive(Debug, Clone, Default)]
pub enum ConverterSource {
    #[default]
    Bundled,
    Path(PathBuf),
    Value(serde_json::Value),
}

/// Controlled vocabulary: DICOM codes to prose. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Converters {
    /// Phase encoding direction code -> prose (`"j-"` -> "anterior to posterior").
    pub dir: BTreeMap<String, String>,
    /// Scanning sequence abbreviation -> prose (`"EP"` -> "echo planar").
    pub seq: BTreeMap<String, String>,
    /// Sequence variant abbreviation -> prose (`"SP"` -> "spoiled").
    pub seqvar: BTreeMap<String, String>,
}

impl Converters {
    pub fn load(source: ConverterSource) -> ReportResult<Self> {
        match source {
            ConverterSource::Bundled => Self::bundled(),
            ConverterSource::Path(path) => Self::from_file(&path),
            ConverterSource::Value(value) => Self::from_value(value),
        }
    }

    /// The vocabulary shipped with the tool.
    pub fn bundled() -> ReportResult<Self> {
        serde_json::from_str(BUNDLED_CONVERTERS).map_err(|e| ReportError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_value(value: serde_json::Value) -> ReportResult<Self> {
        serde_json::from_value(value).map_err(|e| ReportError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output_file, "report.txt");
        assert_eq!(config.general.verbosity, 2);
        assert!(config.layout.extensions.contains(&".nii.gz".to_string()));
        assert!(config.layout.exclude.contains(&"derivatives".to_string()));
        assert!(config.report.converters.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output_file = "methods.txt"
format = "json"
verbosity = 3

[layout]
exclude = ["derivatives"]

[report]
converters = "my_converters.json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output_file, "methods.txt");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.general.verbosity, 3);
        assert_eq!(config.layout.exclude, vec!["derivatives"]);
        assert_eq!(
            config.report.converters,
            Some(PathBuf::from("my_converters.json"))
        );
        assert!(config.layout.extensions.contains(&".nii".to_string()));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[layout]"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.general.output_file, "report.txt");
    }

    #[test]
    fn test_bundled_converters() {
        let conv = Converters::load(ConverterSource::Bundled).unwrap();
        assert_eq!(conv.dir["j-"], "anterior to posterior");
        assert_eq!(conv.seq["EP"], "echo planar");
        assert_eq!(conv.seqvar["SP"], "spoiled");
    }

    #[test]
    fn test_converters_from_value() {
        let conv = Converters::load(ConverterSource::Value(json!({
            "dir": {"i": "left to right"},
            "seq": {},
            "seqvar": {},
        })))
        .unwrap();
        assert_eq!(conv.dir.len(), 1);
    }

    #[test]
    fn test_converters_bad_shape() {
        let missing_key = json!({"dir": {}, "seq": {}});
        assert!(matches!(
            Converters::from_value(missing_key),
            Err(ReportError::Config(_))
        ));

        let extra_key = json!({"dir": {}, "seq": {}, "seqvar": {}, "task": {}});
        assert!(matches!(
            Converters::from_value(extra_key),
            Err(ReportError::Config(_))
        ));

        assert!(matches!(
            Converters::from_value(json!(["dir", "seq", "seqvar"])),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_converters_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Converters::from_file(&dir.path().join("none.json")),
            Err(ReportError::Io { .. })
        ));
    }
}

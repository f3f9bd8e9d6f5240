//! Configuration schema for weft
//!
//! User configuration lives at `~/.config/weft/config.toml`; a project may
//! carry its own `weft.toml`.

use crate::extensions::DEFAULT_PROBE_MACRO;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Pipeline layout and inclusion rules
    pub pipeline: PipelineConfig,

    /// Transformation extensions
    pub extensions: ExtensionsConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Project root; only files below it are transformed
    pub root_dir: PathBuf,

    /// Where transformed copies are written (unset = caching disabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Extension of files eligible for transformation
    pub source_extension: String,

    /// Only transform below these paths (relative to the root)
    pub include_paths: Vec<PathBuf>,

    /// Never transform below these paths (relative to the root)
    pub exclude_paths: Vec<PathBuf>,

    /// Serve recorded cache copies instead of transforming
    pub production_mode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            cache_dir: None,
            source_extension: "rs".to_string(),
            include_paths: vec![],
            exclude_paths: vec![],
            production_mode: false,
        }
    }
}

/// Extension configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Extensions to register, in order (e.g. "entry-probe")
    pub enabled: Vec<String>,

    /// Macro invoked by the entry-probe extension
    pub probe_macro: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            enabled: vec![],
            probe_macro: DEFAULT_PROBE_MACRO.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[pipeline]"));
        assert!(toml.contains("[extensions]"));
        assert!(!toml.contains("cache_dir"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.pipeline.root_dir, PathBuf::from("."));
        assert_eq!(config.pipeline.source_extension, "rs");
        assert!(config.pipeline.cache_dir.is_none());
        assert_eq!(config.extensions.probe_macro, DEFAULT_PROBE_MACRO);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [pipeline]
            cache_dir = "target/weft"
            exclude_paths = ["vendor"]

            [extensions]
            enabled = ["strip-debug-asserts"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pipeline.cache_dir, Some(PathBuf::from("target/weft")));
        assert_eq!(config.pipeline.exclude_paths, vec![PathBuf::from("vendor")]);
        assert_eq!(config.extensions.enabled, vec!["strip-debug-asserts"]);
        assert_eq!(config.general.log_format, "text"); // default preserved
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::convert::ConvertOptions;
use crate::input::FALLBACK_LANGUAGE;
use crate::output::DEFAULT_TABLE_ROW_LIMIT;
use crate::schema::SchemaSelector;

/// Configuration for zepctl, read from ~/.zepctl/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZepConfig {
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_table_row_limit")]
    pub table_row_limit: usize,
    #[serde(default)]
    pub schema: SchemaSelector,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            table_row_limit: default_table_row_limit(),
            schema: SchemaSelector::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output directory for `batch`
    pub dir: Option<PathBuf>,
}

fn default_language() -> String {
    FALLBACK_LANGUAGE.to_string()
}

fn default_table_row_limit() -> usize {
    DEFAULT_TABLE_ROW_LIMIT
}

impl ZepConfig {
    /// Load config from ~/.zepctl/config.toml (or $ZEPCTL_CONFIG).
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load an explicitly named config file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Self =
            toml::from_str(&content).context("Failed to parse config file (invalid TOML)")?;

        config.expand_variables();
        Ok(config)
    }

    /// Get config file path: $ZEPCTL_CONFIG or ~/.zepctl/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("ZEPCTL_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zepctl/config.toml")
    }

    /// Expand a leading `~/` and `${HOME}` in configured paths
    fn expand_variables(&mut self) {
        if let Some(ref dir) = self.output.dir {
            self.output.dir = Some(expand_path(dir));
        }
    }

    /// Conversion options for a notebook whose images go under `output_dir`.
    pub fn convert_options(&self, output_dir: Option<PathBuf>) -> ConvertOptions {
        ConvertOptions {
            output_dir,
            image_link_dir: None,
            default_language: self.convert.default_language.clone(),
            table_row_limit: self.convert.table_row_limit,
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    let raw = path.display().to_string();
    let expanded = raw.replace("${HOME}", &home.display().to_string());
    match expanded.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(expanded),
    }
}

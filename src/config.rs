//! TOML configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub content: ContentConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Root directory holding one subdirectory per content type.
    pub root: PathBuf,
    /// Locale assigned to files without a locale-prefixed filename.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Locale whose filename prefix pairs translations (`en.index.md`).
    #[serde(default = "default_locale")]
    pub translation_locale: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Column that swallows metadata no other column consumes.
    #[serde(default = "default_overflow_column")]
    pub overflow_column: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            overflow_column: default_overflow_column(),
        }
    }
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_overflow_column() -> String {
    "flat".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.content.default_locale.chars().count() != 2 {
        anyhow::bail!("content.default_locale must be a two-letter code");
    }
    if config.content.translation_locale.chars().count() != 2 {
        anyhow::bail!("content.translation_locale must be a two-letter code");
    }
    if config.sync.overflow_column.is_empty() {
        anyhow::bail!("sync.overflow_column must not be empty");
    }

    Ok(config)
}

//! Loads a [`FuzzyConfig`] from JSON or TOML files.
//!
//! Loading never rejects a config for being malformed: every issue found by
//! [`FuzzyConfig::validate`] is logged and the engine degrades to zero
//! activation where references or shapes are broken. [`load_config_strict`]
//! turns issues into errors instead.

use std::fs;
use std::path::Path;

use dda_core::FuzzyConfig;

use crate::error::{Result, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension (`.json` or `.toml`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(StoreError::InvalidData(format!(
                "unsupported config extension: {}",
                path.display()
            ))),
        }
    }
}

pub fn parse_config(text: &str, format: ConfigFormat) -> Result<FuzzyConfig> {
    let config = match format {
        ConfigFormat::Json => FuzzyConfig::from_json(text)?,
        ConfigFormat::Toml => toml::from_str(text)?,
    };
    Ok(config)
}

fn read_config(path: &Path) -> Result<FuzzyConfig> {
    let format = ConfigFormat::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|e| {
        StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_config(&text, format)
}

/// Load a config, logging validation issues as warnings.
pub fn load_config(path: &Path) -> Result<FuzzyConfig> {
    let config = read_config(path)?;
    let issues = config.validate();
    for issue in &issues {
        tracing::warn!("{}: {issue}", path.display());
    }
    tracing::info!(
        "loaded config {} ({} variables, {} rules, {} issues)",
        path.display(),
        config.variables.len(),
        config.rules.len(),
        issues.len()
    );
    Ok(config)
}

/// Load a config, failing on the first validation issue.
pub fn load_config_strict(path: &Path) -> Result<FuzzyConfig> {
    let config = read_config(path)?;
    let issues = config.validate();
    if issues.is_empty() {
        Ok(config)
    } else {
        let joined: Vec<String> = issues.iter().map(ToString::to_string).collect();
        Err(StoreError::InvalidData(format!(
            "{}: {}",
            path.display(),
            joined.join("; ")
        )))
    }
}

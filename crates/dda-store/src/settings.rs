//! Runtime settings for the adjustment loop and its monitoring, read from a
//! TOML file. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! evaluation_interval = 0.5
//! sampling_interval = 0.1
//! max_samples = 500
//!
//! [[series]]
//! metric = "Health"
//! lower = 0.4
//! upper = 0.6
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use dda_core::constants::{
    DEFAULT_EVALUATION_INTERVAL, DEFAULT_FLOW_LOWER, DEFAULT_FLOW_UPPER, DEFAULT_MAX_SAMPLES,
    DEFAULT_SAMPLING_INTERVAL,
};
use dda_core::{MetricSeries, MetricsMonitor};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Base directory for dda data: `DDA_DATA_DIR`, else `~/.dda`.
pub fn default_base_dir() -> PathBuf {
    if let Ok(dir) = env::var("DDA_DATA_DIR")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs_home().join(".dda")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between controller evaluations; 0 evaluates every tick.
    pub evaluation_interval: f64,
    /// Seconds between monitor samples; 0 samples every tick.
    pub sampling_interval: f64,
    pub max_samples: usize,
    pub series: Vec<SeriesSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            evaluation_interval: DEFAULT_EVALUATION_INTERVAL,
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            max_samples: DEFAULT_MAX_SAMPLES,
            series: Vec::new(),
        }
    }
}

/// Flow band for one monitored metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesSettings {
    pub metric: String,
    #[serde(default = "default_lower")]
    pub lower: f64,
    #[serde(default = "default_upper")]
    pub upper: f64,
}

fn default_lower() -> f64 {
    DEFAULT_FLOW_LOWER
}

fn default_upper() -> f64 {
    DEFAULT_FLOW_UPPER
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.check()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml_str(&text)?;
        tracing::info!("loaded settings {}", path.display());
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        for (name, value) in [
            ("evaluation_interval", self.evaluation_interval),
            ("sampling_interval", self.sampling_interval),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(StoreError::InvalidData(format!(
                    "{name} must be a finite, non-negative number of seconds, got {value}"
                )));
            }
        }
        for s in &self.series {
            if !(s.lower.is_finite() && s.upper.is_finite()) {
                return Err(StoreError::InvalidData(format!(
                    "series '{}': flow band bounds must be finite",
                    s.metric
                )));
            }
            if s.lower > s.upper {
                return Err(StoreError::InvalidData(format!(
                    "series '{}': lower bound {} exceeds upper bound {}",
                    s.metric, s.lower, s.upper
                )));
            }
        }
        Ok(())
    }

    /// Monitor with one series per `[[series]]` entry.
    pub fn monitor(&self) -> MetricsMonitor {
        MetricsMonitor::new(self.series.iter().map(|s| {
            MetricSeries::new(&s.metric)
                .with_band(s.lower, s.upper)
                .with_max_samples(self.max_samples)
        }))
        .with_interval(self.sampling_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.evaluation_interval, 0.5);
    }

    #[test]
    fn test_series_band_defaults() {
        let settings = Settings::from_toml_str(
            r#"
evaluation_interval = 0.0
max_samples = 50

[[series]]
metric = "Health"

[[series]]
metric = "Ammo"
lower = 0.2
upper = 0.8
"#,
        )
        .unwrap();
        assert_eq!(settings.evaluation_interval, 0.0);
        assert_eq!(settings.series[0].lower, 0.4);
        assert_eq!(settings.series[0].upper, 0.6);
        assert_eq!(settings.series[1].lower, 0.2);

        let monitor = settings.monitor();
        let ammo = monitor.series("Ammo").unwrap();
        assert_eq!(ammo.max_samples(), 50);
        assert_eq!(ammo.upper, 0.8);
    }

    #[test]
    fn test_rejects_inverted_band() {
        let err = Settings::from_toml_str("[[series]]\nmetric = \"X\"\nlower = 0.9\nupper = 0.1\n")
            .unwrap_err();
        assert!(err.to_string().contains("exceeds upper bound"));
    }

    #[test]
    fn test_rejects_negative_interval() {
        assert!(Settings::from_toml_str("sampling_interval = -1.0").is_err());
    }

    #[test]
    fn test_rejects_infinite_interval() {
        let err = Settings::from_toml_str("evaluation_interval = inf").unwrap_err();
        assert!(err.to_string().contains("evaluation_interval"));
        assert!(Settings::from_toml_str("sampling_interval = inf").is_err());
        assert!(Settings::from_toml_str("evaluation_interval = nan").is_err());
    }

    #[test]
    fn test_rejects_infinite_band() {
        let err = Settings::from_toml_str("[[series]]\nmetric = \"X\"\nupper = inf\n")
            .unwrap_err();
        assert!(err.to_string().contains("must be finite"));
    }
}

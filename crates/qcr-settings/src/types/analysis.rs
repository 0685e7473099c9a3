//! Analysis defaults and logging settings.

use serde::{Deserialize, Serialize};

/// Defaults applied by the full-analysis workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    /// Histogram bin count when the caller does not pick one.
    pub default_bins: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { default_bins: 10 }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

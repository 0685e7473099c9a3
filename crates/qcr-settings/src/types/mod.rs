//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may specify any subset of fields.

mod analysis;
mod client;

pub use analysis::*;
pub use client::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "client": { "url": "ws://qc.example:8081/quality", "requestTimeoutMs": 10000 },
///   "analysis": { "defaultBins": 12 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QcrSettings {
    /// Backend connection and call behaviour.
    pub client: ClientSettings,
    /// Defaults for analysis workflows.
    pub analysis: AnalysisSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

use qcr_core::Command;
use qcr_settings::{ClientSettings, DuplicatePolicy, QcrSettings};
use tracing::warn;

/// Resolved configuration for one [`QcrClient`](crate::QcrClient).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend WebSocket endpoint.
    pub url: String,
    /// Dial deadline.
    pub connect_timeout: Duration,
    /// Default response deadline per call.
    pub request_timeout: Duration,
    /// Per-command response deadlines.
    pub command_timeouts: HashMap<Command, Duration>,
    /// Handling of a second call for an outstanding command.
    pub duplicate_policy: DuplicatePolicy,
    /// Whether calls re-dial after the connection was closed.
    pub reconnect_on_demand: bool,
    /// Histogram bins used by the full-analysis workflow by default.
    pub default_bins: u32,
}

impl ClientConfig {
    /// Config for `url` with every other value at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Build from loaded settings.
    pub fn from_settings(settings: &QcrSettings) -> Self {
        let mut config = Self::from(&settings.client);
        config.default_bins = settings.analysis.default_bins;
        config
    }

    /// Response deadline for `command`.
    pub fn timeout_for(&self, command: Command) -> Duration {
        self.command_timeouts
            .get(&command)
            .copied()
            .unwrap_or(self.request_timeout)
    }

    /// Override the default response deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the response deadline for one command.
    #[must_use]
    pub fn with_command_timeout(mut self, command: Command, timeout: Duration) -> Self {
        let _ = self.command_timeouts.insert(command, timeout);
        self
    }

    /// Override the dial deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Select the duplicate-call policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Enable or disable re-dialling after close.
    #[must_use]
    pub fn with_reconnect_on_demand(mut self, enabled: bool) -> Self {
        self.reconnect_on_demand = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for ClientConfig {
    fn from(settings: &ClientSettings) -> Self {
        let mut command_timeouts = HashMap::new();
        for (name, ms) in &settings.command_timeouts {
            match Command::from_wire(name) {
                Some(command) => {
                    let _ = command_timeouts.insert(command, Duration::from_millis(*ms));
                }
                None => warn!(command = %name, "timeout configured for unknown command, ignoring"),
            }
        }
        Self {
            url: settings.url.clone(),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
            command_timeouts,
            duplicate_policy: settings.duplicate_policy,
            reconnect_on_demand: settings.reconnect_on_demand,
            default_bins: qcr_settings::AnalysisSettings::default().default_bins,
        }
    }
}

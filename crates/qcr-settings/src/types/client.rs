//! Backend connection settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What to do when a call is issued for a command that already has one
/// outstanding.
///
/// The backend correlates responses by command name only, so two in-flight
/// calls for the same command cannot both be matched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The newer call takes the correlation slot. The older one is orphaned
    /// and can only settle by its own timeout or by the connection closing.
    #[default]
    Replace,
    /// The newer call fails immediately without being sent.
    Reject,
}

/// Connection and per-call settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Backend WebSocket endpoint.
    pub url: String,
    /// Dial deadline in milliseconds.
    pub connect_timeout_ms: u64,
    /// Response deadline per call in milliseconds.
    pub request_timeout_ms: u64,
    /// Per-command response deadlines keyed by wire command name
    /// (e.g. `"analyze"`), overriding `request_timeout_ms`.
    pub command_timeouts: BTreeMap<String, u64>,
    /// Handling of a second call for an outstanding command.
    pub duplicate_policy: DuplicatePolicy,
    /// Whether calls re-dial after the connection was closed. A client that
    /// was never connected always dials on first use.
    pub reconnect_on_demand: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8081/quality".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 5_000,
            command_timeouts: BTreeMap::new(),
            duplicate_policy: DuplicatePolicy::Replace,
            reconnect_on_demand: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ClientSettings::default();
        assert_eq!(s.url, "ws://localhost:8081/quality");
        assert_eq!(s.connect_timeout_ms, 5_000);
        assert_eq!(s.request_timeout_ms, 5_000);
        assert_eq!(s.duplicate_policy, DuplicatePolicy::Replace);
        assert!(s.reconnect_on_demand);
    }

    #[test]
    fn command_timeout_override() {
        let mut s = ClientSettings::default();
        let _ = s.command_timeouts.insert("analyze".into(), 30_000);
        assert_eq!(s.command_timeouts.get("analyze"), Some(&30_000));
        assert_eq!(s.command_timeouts.get("get_cdf"), None);
    }

    #[test]
    fn policy_wire_names() {
        assert_eq!(serde_json::to_value(DuplicatePolicy::Reject).unwrap(), "reject");
        let p: DuplicatePolicy = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(p, DuplicatePolicy::Replace);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let s: ClientSettings =
            serde_json::from_str(r#"{"duplicatePolicy":"reject","commandTimeouts":{"get_histogram":900}}"#)
                .unwrap();
        assert_eq!(s.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(s.command_timeouts.get("get_histogram"), Some(&900));
        assert_eq!(s.connect_timeout_ms, 5_000);
    }
}

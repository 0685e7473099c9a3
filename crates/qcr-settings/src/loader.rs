//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`QcrSettings::default()`]
//! 2. If `~/.qcr/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `QCR_*` environment variable overrides (highest priority)

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{DuplicatePolicy, QcrSettings};

/// Accepted `connectTimeoutMs` values.
pub const CONNECT_TIMEOUT_MS_RANGE: RangeInclusive<u64> = 100..=600_000;
/// Accepted `requestTimeoutMs` and `commandTimeouts` values.
pub const REQUEST_TIMEOUT_MS_RANGE: RangeInclusive<u64> = 1..=3_600_000;
/// Accepted `defaultBins` values.
pub const DEFAULT_BINS_RANGE: RangeInclusive<u32> = 1..=1_000;

/// Resolve the path to the settings file (`~/.qcr/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".qcr").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<QcrSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<QcrSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Load defaults merged with the file at `path`, without env overrides.
pub fn load_file(path: &Path) -> Result<QcrSettings> {
    let defaults = serde_json::to_value(QcrSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: QcrSettings = serde_json::from_value(merged)?;
    enforce_ranges(&mut settings);
    Ok(settings)
}

/// Reset out-of-range numeric values to their defaults.
///
/// Uses the same bounds as the env overrides. Out-of-range per-command
/// timeouts are dropped so the command falls back to `requestTimeoutMs`.
pub fn enforce_ranges(settings: &mut QcrSettings) {
    let defaults = QcrSettings::default();
    let client = &mut settings.client;

    if !CONNECT_TIMEOUT_MS_RANGE.contains(&client.connect_timeout_ms) {
        warn!(
            key = "client.connectTimeoutMs",
            value = client.connect_timeout_ms,
            "out of range, using default"
        );
        client.connect_timeout_ms = defaults.client.connect_timeout_ms;
    }
    if !REQUEST_TIMEOUT_MS_RANGE.contains(&client.request_timeout_ms) {
        warn!(
            key = "client.requestTimeoutMs",
            value = client.request_timeout_ms,
            "out of range, using default"
        );
        client.request_timeout_ms = defaults.client.request_timeout_ms;
    }
    client.command_timeouts.retain(|command, ms| {
        let ok = REQUEST_TIMEOUT_MS_RANGE.contains(&*ms);
        if !ok {
            warn!(
                key = "client.commandTimeouts",
                %command,
                value = *ms,
                "out of range, ignoring"
            );
        }
        ok
    });
    if !DEFAULT_BINS_RANGE.contains(&settings.analysis.default_bins) {
        warn!(
            key = "analysis.defaultBins",
            value = settings.analysis.default_bins,
            "out of range, using default"
        );
        settings.analysis.default_bins = defaults.analysis.default_bins;
    }
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key with `source` winning; arrays and primitives in
/// `source` replace `target` wholesale; `null` in `source` keeps `target`.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `QCR_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut QcrSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` to read variables.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_overrides<F>(settings: &mut QcrSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("QCR_URL") {
        settings.client.url = v;
    }
    if let Some(v) = env.u64_in("QCR_CONNECT_TIMEOUT_MS", &CONNECT_TIMEOUT_MS_RANGE) {
        settings.client.connect_timeout_ms = v;
    }
    if let Some(v) = env.u64_in("QCR_REQUEST_TIMEOUT_MS", &REQUEST_TIMEOUT_MS_RANGE) {
        settings.client.request_timeout_ms = v;
    }
    if let Some(v) = env.parsed("QCR_DUPLICATE_POLICY", parse_duplicate_policy) {
        settings.client.duplicate_policy = v;
    }
    if let Some(v) = env.parsed("QCR_RECONNECT_ON_DEMAND", parse_bool) {
        settings.client.reconnect_on_demand = v;
    }
    if let Some(v) = env.parsed("QCR_DEFAULT_BINS", |s| {
        parse_u32_range(s, *DEFAULT_BINS_RANGE.start(), *DEFAULT_BINS_RANGE.end())
    }) {
        settings.analysis.default_bins = v;
    }
    if let Some(v) = env.string("QCR_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a duplicate policy name (case-insensitive).
pub fn parse_duplicate_policy(val: &str) -> Option<DuplicatePolicy> {
    match val.to_lowercase().as_str() {
        "replace" => Some(DuplicatePolicy::Replace),
        "reject" => Some(DuplicatePolicy::Reject),
        _ => None,
    }
}

// ── Env var reading ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, range: &RangeInclusive<u64>) -> Option<u64> {
        self.parsed(name, |s| parse_u64_range(s, *range.start(), *range.end()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! # qcr-settings
//!
//! Layered configuration for the Quality Control Room client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`QcrSettings::default()`]
//! 2. **User file**: `~/.qcr/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `QCR_*` overrides (highest priority)
//!
//! There is no global instance: callers load settings once and pass them
//! to whatever needs them, so several differently-configured clients can
//! coexist in one process.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    CONNECT_TIMEOUT_MS_RANGE, DEFAULT_BINS_RANGE, REQUEST_TIMEOUT_MS_RANGE, apply_env_overrides,
    apply_overrides, deep_merge, enforce_ranges, load_file, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;

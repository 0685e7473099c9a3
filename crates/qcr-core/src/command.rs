//! Remote command identifiers and the distribution-kind tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named remote operation understood by the analysis backend.
///
/// The wire name doubles as the correlation key: a response is matched to
/// its caller by the `command` it echoes, never by a per-call id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Server identity and version.
    About,
    /// Scale samples, fit parameter bounds, run goodness-of-fit tests.
    Analyze,
    /// Confidence-bound curves over the scaled samples.
    GetIntervals,
    /// CDF curves for each fitted parameter set.
    GetCdf,
    /// PDF curves for each fitted parameter set.
    GetPdf,
    /// Binned observed and expected frequencies.
    GetHistogram,
}

impl Command {
    /// Every command, in protocol documentation order.
    pub const ALL: [Self; 6] = [
        Self::About,
        Self::Analyze,
        Self::GetIntervals,
        Self::GetCdf,
        Self::GetPdf,
        Self::GetHistogram,
    ];

    /// The name carried in the envelope's `command` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Analyze => "analyze",
            Self::GetIntervals => "get_intervals",
            Self::GetCdf => "get_cdf",
            Self::GetPdf => "get_pdf",
            Self::GetHistogram => "get_histogram",
        }
    }

    /// Look up a command by its wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wire name that does not correspond to any [`Command`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| UnknownCommand(s.to_owned()))
    }
}

/// Which statistical model the backend fits.
///
/// Opaque to the client: any value is forwarded as-is and the backend
/// decides whether it is supported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributionKind(pub u8);

impl DistributionKind {
    /// Beta distribution on the scaled `[0, 1]` domain.
    pub const BETA: Self = Self(0);
    /// Normal distribution.
    pub const NORMAL: Self = Self(1);
    /// Defect-rate model.
    pub const DEFECTS: Self = Self(2);

    /// Human-readable label for known kinds.
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("beta"),
            1 => Some("normal"),
            2 => Some("defects"),
            _ => None,
        }
    }
}

impl From<u8> for DistributionKind {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "kind({})", self.0),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

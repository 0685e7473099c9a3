//! Outbound request envelopes.

use serde::{Deserialize, Serialize};

use crate::command::{Command, DistributionKind};

/// A two-parameter distribution parameterisation (alpha/beta or mean/std).
pub type ParamPair = [f64; 2];

/// A request envelope: `{"command": ..., ...command-specific fields}`.
///
/// Serialises with the command tag inline so the frame matches what the
/// backend's router expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    /// `about`
    About,
    /// `analyze`
    Analyze {
        /// Model to fit.
        distribution: DistributionKind,
        /// Raw sample values.
        data: Vec<f64>,
        /// Domain lower bound used for scaling.
        min_value: f64,
        /// Domain upper bound used for scaling.
        max_value: f64,
        /// Population size for the confidence interval.
        population_size: u64,
    },
    /// `get_intervals`
    GetIntervals {
        /// Model to fit.
        distribution: DistributionKind,
        /// Scaled samples returned by `analyze`.
        scaled_data: Vec<f64>,
        /// Population size for the confidence interval.
        population_size: u64,
    },
    /// `get_cdf`
    GetCdf {
        /// Model to evaluate.
        distribution: DistributionKind,
        /// Lower-bound fit.
        params_min: ParamPair,
        /// Upper-bound fit.
        params_max: ParamPair,
        /// Model-predicted parameters.
        predicted_params: ParamPair,
        /// Method-of-moments parameters.
        sampling_params: ParamPair,
    },
    /// `get_pdf`
    GetPdf {
        /// Model to evaluate.
        distribution: DistributionKind,
        /// Lower-bound fit.
        params_min: ParamPair,
        /// Upper-bound fit.
        params_max: ParamPair,
        /// Model-predicted parameters.
        predicted_params: ParamPair,
        /// Method-of-moments parameters.
        sampling_params: ParamPair,
    },
    /// `get_histogram`
    GetHistogram {
        /// Model to evaluate.
        distribution: DistributionKind,
        /// Scaled samples returned by `analyze`.
        scaled_data: Vec<f64>,
        /// Number of bins.
        bins: u32,
        /// Lower-bound fit.
        params_min: ParamPair,
        /// Upper-bound fit.
        params_max: ParamPair,
        /// Model-predicted parameters.
        predicted_params: ParamPair,
    },
}

impl Request {
    /// The command this envelope invokes (and the key its response is
    /// correlated by).
    #[must_use]
    pub const fn command(&self) -> Command {
        match self {
            Self::About => Command::About,
            Self::Analyze { .. } => Command::Analyze,
            Self::GetIntervals { .. } => Command::GetIntervals,
            Self::GetCdf { .. } => Command::GetCdf,
            Self::GetPdf { .. } => Command::GetPdf,
            Self::GetHistogram { .. } => Command::GetHistogram,
        }
    }

    /// Serialise to the JSON text frame sent over the socket.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Typed result records for each command and the composite full analysis.
//!
//! Field names follow the backend's snake_case wire format so a result
//! decodes straight from the response envelope's fields.

use serde::{Deserialize, Serialize};

use crate::request::ParamPair;

/// `about`: server identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Server banner.
    #[serde(default)]
    pub message: Option<String>,
}

/// One chi-square goodness-of-fit summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    /// Test statistic.
    pub chi2: f64,
    /// p-value of the statistic.
    pub p_value: f64,
    /// Whether the null hypothesis (sample follows the fit) is rejected.
    pub reject_null: bool,
    /// Critical value at the server's significance level.
    pub critical_value: f64,
    /// Degrees of freedom, when the server reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<u32>,
}

/// `analyze`: scaled samples, fitted parameters and fit tests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Number of samples analysed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<u64>,
    /// Population size echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_size: Option<u64>,
    /// Domain lower bound used for scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Domain upper bound used for scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Samples scaled into the model's domain.
    pub scaled_data: Vec<f64>,
    /// Lower confidence-bound fit.
    pub params_min: ParamPair,
    /// Upper confidence-bound fit.
    pub params_max: ParamPair,
    /// Model-predicted parameters.
    pub predicted_params: ParamPair,
    /// Method-of-moments parameters.
    pub sampling_params: ParamPair,
    /// Fit test against `params_min`.
    pub chi2_min: GoodnessOfFit,
    /// Fit test against `params_max`.
    pub chi2_max: GoodnessOfFit,
    /// Fit test against `predicted_params`.
    pub chi2_pred: GoodnessOfFit,
}

/// `get_intervals`: confidence-bound curves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalCurves {
    /// Lower bound of the empirical CDF band.
    pub cdf_min: Vec<f64>,
    /// Upper bound of the empirical CDF band.
    pub cdf_max: Vec<f64>,
}

/// `get_cdf`: CDF per parameter set over a shared domain grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CdfCurves {
    /// Shared x grid.
    pub domain: Vec<f64>,
    /// CDF of `params_min`.
    pub fitted_cdf_min: Vec<f64>,
    /// CDF of `params_max`.
    pub fitted_cdf_max: Vec<f64>,
    /// CDF of `predicted_params`.
    pub predicted_cdf: Vec<f64>,
    /// CDF of `sampling_params`.
    pub sampling_cdf: Vec<f64>,
}

/// `get_pdf`: PDF per parameter set over a shared domain grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfCurves {
    /// Shared x grid. Named apart from [`CdfCurves::domain`] so both can
    /// sit in one flattened record; the wire field is still `domain`.
    #[serde(rename = "domain", skip_serializing)]
    pub pdf_domain: Vec<f64>,
    /// PDF of `params_min`.
    pub fitted_pdf_min: Vec<f64>,
    /// PDF of `params_max`.
    pub fitted_pdf_max: Vec<f64>,
    /// PDF of `predicted_params`.
    pub predicted_pdf: Vec<f64>,
    /// PDF of `sampling_params`.
    pub sampling_pdf: Vec<f64>,
}

/// `get_histogram`: observed and expected bin frequencies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` edges.
    pub bin_edges: Vec<f64>,
    /// Observed count per bin.
    pub observed_freq: Vec<f64>,
    /// Expected count per bin under `params_min`.
    pub expected_freq_min: Vec<f64>,
    /// Expected count per bin under `params_max`.
    pub expected_freq_max: Vec<f64>,
    /// Expected count per bin under `predicted_params`.
    pub expected_freq_pred: Vec<f64>,
    /// Fit tests recomputed for this binning, when sent.
    #[serde(default, skip_serializing)]
    pub chi2_min: Option<GoodnessOfFit>,
    /// See [`Histogram::chi2_min`].
    #[serde(default, skip_serializing)]
    pub chi2_max: Option<GoodnessOfFit>,
    /// See [`Histogram::chi2_min`].
    #[serde(default, skip_serializing)]
    pub chi2_pred: Option<GoodnessOfFit>,
}

impl Histogram {
    /// Number of bins described by the edges.
    pub fn bins(&self) -> usize {
        self.bin_edges.len().saturating_sub(1)
    }
}

/// The merged outcome of the full-analysis workflow.
///
/// Serialises as one flat object carrying every field of the five
/// command results.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FullAnalysis {
    /// From `analyze`.
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    /// From `get_intervals`.
    #[serde(flatten)]
    pub intervals: IntervalCurves,
    /// From `get_cdf`.
    #[serde(flatten)]
    pub cdf: CdfCurves,
    /// From `get_pdf`.
    #[serde(flatten)]
    pub pdf: PdfCurves,
    /// From `get_histogram`.
    #[serde(flatten)]
    pub histogram: Histogram,
}

impl FullAnalysis {
    /// Replace the histogram with a re-binned one.
    ///
    /// Fit tests carried by the new histogram supersede the ones from
    /// `analyze`; absent ones leave the existing values alone.
    pub fn apply_histogram(&mut self, histogram: Histogram) {
        if let Some(gof) = histogram.chi2_min {
            self.analysis.chi2_min = gof;
        }
        if let Some(gof) = histogram.chi2_max {
            self.analysis.chi2_max = gof;
        }
        if let Some(gof) = histogram.chi2_pred {
            self.analysis.chi2_pred = gof;
        }
        self.histogram = histogram;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Full-analysis workflow: `analyze`, then four dependent calls in parallel.

use qcr_core::{DistributionKind, FullAnalysis, Histogram};
use tracing::{info, instrument};

use crate::client::QcrClient;
use crate::errors::Result;

/// Inputs to [`QcrClient::full_analysis`].
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    /// Model to fit.
    pub distribution: DistributionKind,
    /// Raw sample values.
    pub data: Vec<f64>,
    /// Domain lower bound.
    pub min_value: f64,
    /// Domain upper bound.
    pub max_value: f64,
    /// Population size for the confidence interval.
    pub population_size: u64,
    /// Histogram bins; the client's configured default when `None`.
    pub bins: Option<u32>,
}

impl QcrClient {
    /// Run the complete analysis and merge every result into one record.
    ///
    /// `get_intervals`, `get_cdf`, `get_pdf` and `get_histogram` are all in
    /// flight at once; they use distinct commands so they never displace
    /// each other. The first failure fails the whole workflow with that
    /// call's error, and the remaining calls are abandoned.
    #[instrument(
        skip_all,
        fields(distribution = %request.distribution, samples = request.data.len())
    )]
    pub async fn full_analysis(&self, request: AnalysisRequest) -> Result<FullAnalysis> {
        let AnalysisRequest {
            distribution,
            data,
            min_value,
            max_value,
            population_size,
            bins,
        } = request;
        let bins = bins.unwrap_or(self.config().default_bins);

        let analysis = self
            .analyze(distribution, data, min_value, max_value, population_size)
            .await?;
        let population = analysis.population_size.unwrap_or(population_size);

        let (intervals, cdf, pdf, histogram) = tokio::try_join!(
            self.get_intervals(distribution, analysis.scaled_data.clone(), population),
            self.get_cdf(
                distribution,
                analysis.params_min,
                analysis.params_max,
                analysis.predicted_params,
                analysis.sampling_params,
            ),
            self.get_pdf(
                distribution,
                analysis.params_min,
                analysis.params_max,
                analysis.predicted_params,
                analysis.sampling_params,
            ),
            self.get_histogram(
                distribution,
                analysis.scaled_data.clone(),
                bins,
                analysis.params_min,
                analysis.params_max,
                analysis.predicted_params,
            ),
        )?;

        info!(bins = histogram.bins(), "full analysis complete");
        Ok(FullAnalysis {
            analysis,
            intervals,
            cdf,
            pdf,
            histogram,
        })
    }

    /// Re-bin the histogram of an existing analysis.
    ///
    /// On failure `full` is left untouched.
    pub async fn rebin(
        &self,
        full: &mut FullAnalysis,
        distribution: DistributionKind,
        bins: u32,
    ) -> Result<()> {
        let histogram: Histogram = self
            .get_histogram(
                distribution,
                full.analysis.scaled_data.clone(),
                bins,
                full.analysis.params_min,
                full.analysis.params_max,
                full.analysis.predicted_params,
            )
            .await?;
        full.apply_histogram(histogram);
        Ok(())
    }
}

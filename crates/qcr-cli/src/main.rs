//! # qcr
//!
//! Command-line client for the Quality Control Room analysis server.
//! Issues one command (or the full-analysis workflow) and prints the
//! result as JSON on stdout.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use qcr_client::{AnalysisRequest, ClientConfig, QcrClient};
use qcr_core::DistributionKind;
use qcr_settings::QcrSettings;
use serde::Serialize;
use tracing::debug;

/// Quality Control Room client.
#[derive(Parser, Debug)]
#[command(name = "qcr", version, about = "Quality Control Room analysis client")]
struct Cli {
    /// Backend WebSocket URL (overrides settings).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Response deadline per call in milliseconds (overrides settings).
    #[arg(
        long,
        global = true,
        value_parser = clap::value_parser!(u64).range(qcr_settings::REQUEST_TIMEOUT_MS_RANGE)
    )]
    timeout_ms: Option<u64>,

    /// Log filter, e.g. `info` or `qcr_client=debug` (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Settings file to load instead of `~/.qcr/settings.json`.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the server's version and banner.
    About,
    /// Fit the samples and report parameters and fit tests.
    Analyze(SampleArgs),
    /// Fit the samples and report the observed/expected histogram.
    Histogram {
        #[command(flatten)]
        samples: SampleArgs,
        /// Number of bins (defaults to `analysis.defaultBins`).
        #[arg(long, value_parser = parse_bins)]
        bins: Option<u32>,
    },
    /// Run the full analysis and print the merged result.
    Full {
        #[command(flatten)]
        samples: SampleArgs,
        /// Number of bins (defaults to `analysis.defaultBins`).
        #[arg(long, value_parser = parse_bins)]
        bins: Option<u32>,
    },
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Comma-separated sample values.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    data: Option<String>,

    /// File of sample values separated by commas or whitespace.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Distribution model: 0 = beta, 1 = normal, 2 = defects.
    #[arg(long, default_value_t = 0)]
    distribution: u8,

    /// Domain lower bound.
    #[arg(long, default_value_t = 0.0)]
    min: f64,

    /// Domain upper bound.
    #[arg(long)]
    max: f64,

    /// Population size for the confidence interval.
    #[arg(long, default_value_t = 100)]
    population: u64,
}

impl SampleArgs {
    fn samples(&self) -> Result<Vec<f64>> {
        let samples = match (&self.data, &self.file) {
            (Some(data), _) => parse_samples(data)?,
            (None, Some(path)) => read_samples(path)?,
            (None, None) => bail!("either --data or --file is required"),
        };
        if samples.is_empty() {
            bail!("no sample values given");
        }
        if self.max <= self.min {
            bail!("--max ({}) must be greater than --min ({})", self.max, self.min);
        }
        Ok(samples)
    }

    fn request(&self, bins: Option<u32>) -> Result<AnalysisRequest> {
        Ok(AnalysisRequest {
            distribution: DistributionKind(self.distribution),
            data: self.samples()?,
            min_value: self.min,
            max_value: self.max,
            population_size: self.population,
            bins,
        })
    }
}

fn parse_bins(text: &str) -> Result<u32, String> {
    let range = qcr_settings::DEFAULT_BINS_RANGE;
    let bins: u32 = text.parse().map_err(|e| format!("{e}"))?;
    if range.contains(&bins) {
        Ok(bins)
    } else {
        Err(format!("must be between {} and {}", range.start(), range.end()))
    }
}

/// Parse numbers separated by commas and/or whitespace.
fn parse_samples(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(i, token)| {
            token
                .parse::<f64>()
                .with_context(|| format!("sample {} is not a number: {token:?}", i + 1))
        })
        .collect()
}

fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;
    parse_samples(&text).with_context(|| format!("Invalid sample file {}", path.display()))
}

fn load_settings(cli: &Cli) -> Result<QcrSettings> {
    let mut settings = match &cli.settings {
        Some(path) => qcr_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => qcr_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(url) = &cli.url {
        settings.client.url.clone_from(url);
    }
    if let Some(ms) = cli.timeout_ms {
        settings.client.request_timeout_ms = ms;
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode result")?;
    println!("{text}");
    Ok(())
}

async fn run(cli: Cli, settings: &QcrSettings) -> Result<()> {
    let config = ClientConfig::from_settings(settings);
    let default_bins = config.default_bins;
    let url = config.url.clone();
    let client = QcrClient::new(config);
    debug!(%url, "client ready");

    match cli.command {
        Cmd::About => print_json(&client.about().await?)?,
        Cmd::Analyze(samples) => {
            let req = samples.request(None)?;
            let result = client
                .analyze(
                    req.distribution,
                    req.data,
                    req.min_value,
                    req.max_value,
                    req.population_size,
                )
                .await?;
            print_json(&result)?;
        }
        Cmd::Histogram { samples, bins } => {
            let req = samples.request(bins)?;
            let analysis = client
                .analyze(
                    req.distribution,
                    req.data,
                    req.min_value,
                    req.max_value,
                    req.population_size,
                )
                .await?;
            let histogram = client
                .get_histogram(
                    req.distribution,
                    analysis.scaled_data,
                    bins.unwrap_or(default_bins),
                    analysis.params_min,
                    analysis.params_max,
                    analysis.predicted_params,
                )
                .await?;
            print_json(&histogram)?;
        }
        Cmd::Full { samples, bins } => {
            let full = client.full_analysis(samples.request(bins)?).await?;
            print_json(&full)?;
        }
    }

    client.close();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    qcr_core::logging::init_subscriber(&settings.logging.level);

    run(cli, &settings).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

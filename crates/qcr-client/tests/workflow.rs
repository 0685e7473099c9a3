//! The full-analysis workflow end to end.

mod common;

use std::time::Duration;

use common::{Action, MockServer, failed, fixture};
use qcr_client::{AnalysisRequest, ClientConfig, QcrClient, RpcError};
use qcr_core::{Command, DistributionKind};
use serde_json::json;

fn request(bins: Option<u32>) -> AnalysisRequest {
    AnalysisRequest {
        distribution: DistributionKind::BETA,
        data: vec![1.2, 3.4, 2.1, 4.4, 0.7],
        min_value: 0.0,
        max_value: 5.0,
        population_size: 250,
        bins,
    }
}

#[tokio::test]
async fn full_analysis_merges_every_result() {
    let server = MockServer::healthy().await;
    let client = QcrClient::new(ClientConfig::new(server.url.clone()));

    let full = client.full_analysis(request(None)).await.unwrap();

    assert_eq!(full.analysis.scaled_data.len(), 5);
    assert_eq!(full.intervals.cdf_min.len(), 5);
    assert_eq!(full.cdf.domain.len(), 3);
    assert_eq!(full.pdf.pdf_domain.len(), 3);
    assert_eq!(full.histogram.bins(), 10);

    let commands = server.received_commands();
    assert_eq!(commands[0], "analyze");
    let mut rest = commands[1..].to_vec();
    rest.sort();
    assert_eq!(rest, vec!["get_cdf", "get_histogram", "get_intervals", "get_pdf"]);

    // dependent calls reuse the fitted parameters
    let frames = server.received();
    let cdf = frames.iter().find(|f| f["command"] == "get_cdf").unwrap();
    assert_eq!(cdf["params_min"], json!([1.8, 2.9]));
    assert_eq!(cdf["sampling_params"], json!([2.1, 3.2]));
    let intervals = frames.iter().find(|f| f["command"] == "get_intervals").unwrap();
    assert_eq!(intervals["population_size"], json!(250));

    let flat = serde_json::to_value(&full).unwrap();
    for key in [
        "scaled_data",
        "cdf_max",
        "predicted_cdf",
        "sampling_pdf",
        "bin_edges",
        "chi2_pred",
    ] {
        assert!(flat.get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn dependent_calls_run_concurrently() {
    let server = MockServer::start(|req| match req["command"].as_str() {
        Some("analyze") => vec![Action::Reply(fixture(req))],
        _ => vec![Action::ReplyAfter(Duration::from_millis(300), fixture(req))],
    })
    .await;
    let client = QcrClient::new(
        ClientConfig::new(server.url.clone()).with_request_timeout(Duration::from_millis(800)),
    );

    let started = tokio::time::Instant::now();
    let full = client.full_analysis(request(Some(6))).await.unwrap();

    assert_eq!(full.histogram.bins(), 6);
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn one_failed_step_fails_the_workflow() {
    let server = MockServer::start(|req| match req["command"].as_str() {
        Some("get_pdf") => vec![Action::Reply(failed(req, "fit failed"))],
        _ => vec![Action::Reply(fixture(req))],
    })
    .await;
    let client = QcrClient::new(ClientConfig::new(server.url.clone()));

    let err = client.full_analysis(request(None)).await.unwrap_err();

    assert_eq!(err.to_string(), "fit failed");
    assert_eq!(err.command(), Some(Command::GetPdf));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn analyze_failure_skips_dependent_calls() {
    let server = MockServer::start(|req| {
        vec![Action::Reply(failed(req, "Insufficient data points"))]
    })
    .await;
    let client = QcrClient::new(ClientConfig::new(server.url.clone()));

    let err = client.full_analysis(request(None)).await.unwrap_err();

    assert_eq!(
        err,
        RpcError::CommandFailed {
            command: Command::Analyze,
            message: "Insufficient data points".into()
        }
    );
    assert_eq!(server.received_commands(), vec!["analyze"]);
}

#[tokio::test]
async fn rebin_replaces_histogram_and_fit_tests() {
    let server = MockServer::start(|req| match req["command"].as_str() {
        Some("get_histogram") if req["bins"] == 20 => {
            let mut frame = fixture(req);
            frame["chi2_pred"] = json!({
                "chi2": 0.5,
                "p_value": 0.9,
                "reject_null": false,
                "critical_value": 30.1
            });
            vec![Action::Reply(frame)]
        }
        _ => vec![Action::Reply(fixture(req))],
    })
    .await;
    let client = QcrClient::new(ClientConfig::new(server.url.clone()));
    let mut full = client.full_analysis(request(None)).await.unwrap();
    let chi2_min_before = full.analysis.chi2_min;

    client.rebin(&mut full, DistributionKind::BETA, 20).await.unwrap();

    assert_eq!(full.histogram.bins(), 20);
    assert!((full.analysis.chi2_pred.chi2 - 0.5).abs() < f64::EPSILON);
    assert_eq!(full.analysis.chi2_min, chi2_min_before);
}

#[tokio::test]
async fn rebin_failure_keeps_previous_histogram() {
    let server = MockServer::start(|req| match req["command"].as_str() {
        Some("get_histogram") if req["bins"] == 3 => {
            vec![Action::Reply(failed(req, "too few bins"))]
        }
        _ => vec![Action::Reply(fixture(req))],
    })
    .await;
    let client = QcrClient::new(ClientConfig::new(server.url.clone()));
    let mut full = client.full_analysis(request(Some(8))).await.unwrap();

    let err = client.rebin(&mut full, DistributionKind::BETA, 3).await.unwrap_err();

    assert_eq!(err.to_string(), "too few bins");
    assert_eq!(full.histogram.bins(), 8);
}

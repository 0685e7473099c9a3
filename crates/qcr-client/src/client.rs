//! Command dispatcher: one typed method per remote command.
//!
//! Every method runs the same steps: make sure the connection is open,
//! build the envelope, register for correlation, send, await settlement,
//! then decode.
//! A call either returns its full typed result or an [`RpcError`]; there is
//! no partial success.

use std::sync::Arc;

use qcr_core::{
    AnalysisResult, CdfCurves, DistributionKind, Histogram, IntervalCurves, ParamPair, PdfCurves,
    Request, ResponseEnvelope, ServerInfo,
};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;

use crate::config::ClientConfig;
use crate::correlator::Correlator;
use crate::errors::{Result, RpcError};
use crate::transport::{ConnectionState, InboundHandler, WsTransport};

/// RPC client for one backend connection.
///
/// Each instance owns its own connection, pending-call table, and timers.
pub struct QcrClient {
    config: ClientConfig,
    correlator: Arc<Correlator>,
    transport: WsTransport,
}

impl QcrClient {
    /// Create a client. No connection is made until the first call or an
    /// explicit [`open`](Self::open).
    pub fn new(config: ClientConfig) -> Self {
        let correlator = Arc::new(Correlator::new(config.duplicate_policy));
        let transport = WsTransport::new(
            config.url.clone(),
            config.connect_timeout,
            Arc::clone(&correlator) as Arc<dyn InboundHandler>,
        );
        Self {
            config,
            correlator,
            transport,
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.subscribe_state()
    }

    /// Number of outstanding calls, including orphaned duplicates.
    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Number of outstanding calls that were displaced by a newer call for
    /// the same command.
    pub fn orphaned_count(&self) -> usize {
        self.correlator.orphaned_count()
    }

    /// Open the connection. A no-op when already connected.
    pub async fn open(&self) -> Result<()> {
        self.transport.open().await
    }

    /// Close the connection, failing every outstanding call with
    /// [`RpcError::ConnectionClosed`].
    pub fn close(&self) {
        self.transport.close();
    }

    async fn ensure_connected(&self) -> Result<()> {
        match self.transport.state() {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Closed if !self.config.reconnect_on_demand => {
                Err(RpcError::NotConnected)
            }
            ConnectionState::Disconnected
            | ConnectionState::Connecting
            | ConnectionState::Closed => self.transport.open().await,
        }
    }

    /// Issue `request` and wait for its raw response.
    pub async fn call(&self, request: Request) -> Result<ResponseEnvelope> {
        let command = request.command();
        self.ensure_connected().await?;

        let frame = request.to_frame().map_err(|e| RpcError::InvalidPayload {
            command,
            reason: e.to_string(),
        })?;
        let pending = self
            .correlator
            .register(command, self.config.timeout_for(command))?;
        self.transport.send(frame)?;
        debug!(%command, "request sent");

        pending.settle().await
    }

    async fn call_typed<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let command = request.command();
        let response = self.call(request).await?;
        response.decode().map_err(|e| RpcError::InvalidPayload {
            command,
            reason: e.to_string(),
        })
    }

    /// `about`: server identity.
    pub async fn about(&self) -> Result<ServerInfo> {
        self.call_typed(Request::About).await
    }

    /// `analyze`: scale the samples into the model's domain, fit parameter
    /// bounds, and test each fit.
    pub async fn analyze(
        &self,
        distribution: DistributionKind,
        data: Vec<f64>,
        min_value: f64,
        max_value: f64,
        population_size: u64,
    ) -> Result<AnalysisResult> {
        self.call_typed(Request::Analyze {
            distribution,
            data,
            min_value,
            max_value,
            population_size,
        })
        .await
    }

    /// `get_intervals`: confidence-bound curves over the scaled samples.
    pub async fn get_intervals(
        &self,
        distribution: DistributionKind,
        scaled_data: Vec<f64>,
        population_size: u64,
    ) -> Result<IntervalCurves> {
        self.call_typed(Request::GetIntervals {
            distribution,
            scaled_data,
            population_size,
        })
        .await
    }

    /// `get_cdf`: one CDF per parameter set over a shared domain.
    pub async fn get_cdf(
        &self,
        distribution: DistributionKind,
        params_min: ParamPair,
        params_max: ParamPair,
        predicted_params: ParamPair,
        sampling_params: ParamPair,
    ) -> Result<CdfCurves> {
        self.call_typed(Request::GetCdf {
            distribution,
            params_min,
            params_max,
            predicted_params,
            sampling_params,
        })
        .await
    }

    /// `get_pdf`: one PDF per parameter set over a shared domain.
    pub async fn get_pdf(
        &self,
        distribution: DistributionKind,
        params_min: ParamPair,
        params_max: ParamPair,
        predicted_params: ParamPair,
        sampling_params: ParamPair,
    ) -> Result<PdfCurves> {
        self.call_typed(Request::GetPdf {
            distribution,
            params_min,
            params_max,
            predicted_params,
            sampling_params,
        })
        .await
    }

    /// `get_histogram`: observed and expected frequencies per bin.
    pub async fn get_histogram(
        &self,
        distribution: DistributionKind,
        scaled_data: Vec<f64>,
        bins: u32,
        params_min: ParamPair,
        params_max: ParamPair,
        predicted_params: ParamPair,
    ) -> Result<Histogram> {
        self.call_typed(Request::GetHistogram {
            distribution,
            scaled_data,
            bins,
            params_min,
            params_max,
            predicted_params,
        })
        .await
    }
}

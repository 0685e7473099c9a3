//! # qcr-client
//!
//! WebSocket RPC client for the Quality Control Room analysis server.
//!
//! - [`transport`]: the single connection, its state machine, and the
//!   connection task
//! - [`correlator`]: matches responses to calls by command name and
//!   supervises per-call timeouts
//! - [`client`]: [`QcrClient`], one typed method per remote command
//! - [`workflow`]: the composite full-analysis operation
//!
//! Responses are correlated by command name, so at most one call per
//! command can be answered at a time. See [`DuplicatePolicy`] for what
//! happens when a second call for the same command is issued.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod correlator;
pub mod errors;
pub mod transport;
pub mod workflow;

pub use client::QcrClient;
pub use config::ClientConfig;
pub use correlator::{Correlator, PendingCall, Settlement};
pub use errors::{Result, RpcError, RpcErrorKind};
pub use qcr_settings::DuplicatePolicy;
pub use transport::{ConnectionState, InboundHandler, WsTransport};
pub use workflow::AnalysisRequest;

//! # qcr-core
//!
//! Foundation types for the Quality Control Room RPC client.
//!
//! - [`command`]: remote command identifiers and the distribution-kind tag
//! - [`request`]: outbound request envelopes
//! - [`response`]: inbound response envelopes and frame parsing
//! - [`results`]: typed result records and the composite full analysis
//! - [`logging`]: subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod command;
pub mod logging;
pub mod request;
pub mod response;
pub mod results;

pub use command::{Command, DistributionKind, UnknownCommand};
pub use request::{ParamPair, Request};
pub use response::{GENERIC_FAILURE, MalformedFrame, ResponseEnvelope};
pub use results::{
    AnalysisResult, CdfCurves, FullAnalysis, GoodnessOfFit, Histogram, IntervalCurves, PdfCurves,
    ServerInfo,
};

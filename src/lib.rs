//! Flow agent — rebuilds bidirectional flows from connection logs and extracts per-flow
//! features for anomaly scoring.
//!
//! Modular structure:
//! - [`records`] — Typed connection records and the Zeek conn.log source
//! - [`flow`] — Canonical flow keys, per-flow state, active-flow engine
//! - [`features`] — Fixed-schema feature vector extraction
//! - [`export`] — NDJSON / CSV feature sinks
//! - [`pipeline`] — Source → engine → sink, replay and live
//! - [`logging`] — Structured logging

pub mod config;
pub mod error;
pub mod records;
pub mod flow;
pub mod features;
pub mod export;
pub mod pipeline;
pub mod logging;

pub use config::AgentConfig;
pub use error::RecordError;
pub use records::{ConnState, ConnectionRecord, ZeekConnReader};
pub use flow::{FlowEngine, FlowKey, FlowState};
pub use features::{extract, FeatureVector, FEATURE_NAMES};
pub use export::FeatureSink;
pub use pipeline::{Pipeline, PipelineSummary};
pub use logging::StructuredLogger;

//! Multi-provider clip analysis worker.
//!
//! This crate provides:
//! - The boundary to AI providers and validation of what they return
//! - Consensus aggregation of per-provider clip proposals
//! - Pipeline orchestration with per-provider timeouts and cancellation
//! - Configuration, structured job logging and metrics

pub mod config;
pub mod consensus;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod provider;

pub use config::WorkerConfig;
pub use consensus::{ConsensusAggregator, ConsensusConfig};
pub use error::{WorkerError, WorkerResult};
pub use logging::{JobLogger, ProviderFailure, Stage};
pub use pipeline::{AnalysisPipeline, JobReport};
pub use provider::{
    ProviderAdapter, ProviderError, ProviderRegistry, RawCandidate, RawViralScore,
    RejectionReason, ReplayProvider, TimeValue,
};

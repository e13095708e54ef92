//! Error types for dataset loading and configuration.

use thiserror::Error;

use crate::types::{ClusterId, JobId, NodeId};

/// Result type alias for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised while loading or validating a dataset.
///
/// All of these are detected before a model is built; they are never part of
/// an optimization outcome.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Parse(String),

    #[error("dataset has no clusters")]
    NoClusters,

    #[error("duplicate cluster id: {0}")]
    DuplicateCluster(ClusterId),

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate job id: {0}")]
    DuplicateJob(JobId),

    #[error("{entity} references unknown cluster {cluster}")]
    UnknownCluster { entity: String, cluster: ClusterId },

    #[error("{entity} has invalid {field}: {value} (must be finite and non-negative)")]
    InvalidQuantity {
        entity: String,
        field: &'static str,
        value: f64,
    },

    #[error("job {0} has zero duration")]
    ZeroDuration(JobId),

    #[error("job {0} ends past the representable horizon")]
    HorizonOverflow(JobId),
}

/// Errors raised while parsing solve settings.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("margin must be in (0, 1], got {0}")]
    InvalidMargin(f64),

    #[error("unknown mode: {0} (expected job-only, node-only or joint)")]
    UnknownMode(String),

    #[error("time limit must be positive")]
    ZeroTimeLimit,

    #[error("mip gap must be finite and non-negative, got {0}")]
    InvalidMipGap(f64),

    #[error("invalid sweep range: start {start}, stop {stop}, step {step}")]
    InvalidSweep { start: f64, stop: f64, step: f64 },

    #[error("sweep step {step} yields more than {max} margins")]
    SweepTooLarge { step: f64, max: usize },
}

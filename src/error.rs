use thiserror::Error;

/// Input and configuration errors, reported before any computation starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("feature dimension mismatch: query has {query} features, reference has {reference}")]
    FeatureMismatch { query: usize, reference: usize },

    #[error("variable axis mismatch: query has {query} variables, reference has {reference}")]
    VariableMismatch { query: usize, reference: usize },

    #[error("empty input: {what}")]
    EmptyInput { what: &'static str },

    #[error("quantile must lie in (0, 1), got {0}")]
    InvalidQuantile(f64),

    #[error("worker count must be >= 1, got {0}")]
    InvalidJobs(usize),

    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("malformed input: {0}")]
    Shape(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Per-row GPD fitting failures. These never abort a batch: the pipeline
/// turns them into `NaN` cells for the affected row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("too few exceedances: need {needed}, have {have}")]
    TooFewExceedances { needed: usize, have: usize },

    #[error("degenerate sample: all {0} excesses are identical")]
    Degenerate(usize),

    #[error("non-finite excess at position {0}")]
    NonFinite(usize),

    #[error("excess at position {index} is not strictly positive ({value})")]
    InvalidExcess { index: usize, value: f64 },

    #[error("maximum-likelihood fit did not converge after {iterations} iterations")]
    NotConverged { iterations: u64 },

    #[error("optimizer failure: {0}")]
    Optimizer(String),

    #[error("fit produced an invalid estimate: scale={scale}, shape={shape}")]
    InvalidEstimate { scale: f64, shape: f64 },
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;

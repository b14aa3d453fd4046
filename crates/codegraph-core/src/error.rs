use thiserror::Error;

/// The error taxonomy shared by every CodeGraph component. Kinds, not
/// type names: callers match on variant, not on the wrapped message.
#[derive(Error, Debug)]
pub enum CodeGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("embedding provider timed out: {0}")]
    ProviderTimeout(String),

    #[error("analyzer error in {file}: {reason}")]
    AnalyzerError { file: String, reason: String },

    #[error("analysis of {0} exceeded its time budget")]
    TaskTimeout(String),

    #[error("store write timed out")]
    Timeout,

    #[error("cache incompatible with current provider: {0}")]
    Incompatible(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("no results above threshold")]
    NoResults,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CodeGraphError>;

// Error handling module
// Defines the benchmark error taxonomy and failure categorization

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while driving a benchmark
#[derive(Error, Debug)]
pub enum BenchError {
    /// Connection refused/reset, DNS failure, broken transport
    #[error("Network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-2xx status
    #[error("HTTP status error: {status}")]
    HttpStatus { status: u16 },

    /// Malformed frame, missing sentinel, unexpected stream structure
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The per-run budget was exceeded
    #[error("Timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Invalid target or batch configuration, surfaced before any exchange
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BenchError {
    /// Categorize this error for failure accounting
    pub fn kind(&self) -> FailureKind {
        match self {
            BenchError::Network(_) => FailureKind::Network,
            BenchError::HttpStatus { .. } => FailureKind::HttpStatus,
            BenchError::Protocol(_) => FailureKind::Protocol,
            BenchError::Timeout { .. } => FailureKind::Timeout,
            BenchError::Config(_) => FailureKind::Config,
        }
    }

    /// Classify a reqwest error into the taxonomy
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            BenchError::Timeout { secs: timeout_secs }
        } else if err.is_decode() {
            BenchError::Protocol(err.to_string())
        } else {
            BenchError::Network(err.to_string())
        }
    }
}

/// Failure category carried on a failed run sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    HttpStatus,
    Protocol,
    Timeout,
    Config,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network"),
            FailureKind::HttpStatus => write!(f, "http-status"),
            FailureKind::Protocol => write!(f, "parse"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Config => write!(f, "config"),
        }
    }
}

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

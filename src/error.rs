// ===============================
// src/error.rs
// ===============================
use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch round trip. Never fatal: the orchestrator
/// degrades the affected panel and keeps its cadence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl FetchError {
    /// Timeouts count as transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Timeout(_))
    }

    /// Short label for metrics/logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Timeout(_) => "timeout",
            FetchError::Protocol(_) => "protocol",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Protocol(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Protocol(e.to_string())
    }
}

/// Outcome of a one-shot operator command (emergency stop trigger/reset).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("request failed: {0}")]
    Request(#[from] FetchError),
    #[error("rejected by service: {0}")]
    Rejected(String),
    #[error("cancelled by operator")]
    Cancelled,
}

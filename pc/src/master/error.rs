//! Control-plane error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the master
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Master not configured: {0}")]
    NotConfigured(String),
}

impl SignalError {
    /// Classify a transport error, keeping timeouts distinct from other failures
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SignalError::Timeout(timeout)
        } else {
            SignalError::Network(err)
        }
    }

    /// Check if this is a transport timeout
    ///
    /// Timeouts are routine while long-polling and are retried without delay.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SignalError::Timeout(_))
    }
}

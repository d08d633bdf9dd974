//! Content source error types.
//!
//! Every failure talking to the content site is a transient feed failure as
//! far as the worker is concerned: the recovery wrapper logs it, backs off and
//! restarts. The variants exist so logs say *what* went wrong.

use thiserror::Error;

/// An error from the content source or the posting action.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP request could not be completed (DNS, TLS, timeout, reset).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The site answered with a non-success status.
    #[error("HTTP {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    /// The site accepted the request but refused the reply.
    #[error("reply rejected: {0}")]
    Rejected(String),

    /// Obtaining or refreshing the access token failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other outage reported by a source implementation.
    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Malformed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code, if the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            SourceError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

//! # Batch Fetch Errors
//!
//! Every failure a batch can produce is one of three kinds: the inputs were
//! rejected before any network activity, a request could not complete, or a
//! response body could not be reduced to a number. The last two carry the
//! zero-based index of the request that failed.

use thiserror::Error;

/// Failure of a whole batch operation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request at `index` could not complete.
    #[error("transport failure on request #{index}: {source}")]
    Transport {
        /// Zero-based position of the failing request in the batch.
        index: usize,
        /// What went wrong on the wire.
        #[source]
        source: TransportError,
    },

    /// The response at `index` could not be parsed.
    #[error("parse failure on response #{index}: {source}")]
    Parse {
        /// Zero-based position of the failing response in the batch.
        index: usize,
        /// Why the body was rejected.
        #[source]
        source: ExtractError,
    },
}

impl FetchError {
    /// Builds an `InvalidArgument` from anything printable.
    pub fn invalid(msg: impl Into<String>) -> Self {
        FetchError::InvalidArgument(msg.into())
    }

    /// Index of the request that triggered the failure, if the batch got that far.
    pub fn index(&self) -> Option<usize> {
        match self {
            FetchError::InvalidArgument(_) => None,
            FetchError::Transport { index, .. } | FetchError::Parse { index, .. } => Some(*index),
        }
    }

    /// Short name of the failure kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidArgument(_) => "invalid_argument",
            FetchError::Transport { .. } => "transport",
            FetchError::Parse { .. } => "parse",
        }
    }
}

/// A single request that did not produce a successful response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS or middleware failure before a status line arrived.
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The request did not finish within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, kept for debugging.
        body: String,
    },

    /// The status was fine but the body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A response body that does not hold the expected count.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Not JSON, or JSON of the wrong shape.
    #[error("malformed response envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with its own error envelope instead of a result.
    #[error("API error {code}: {message}")]
    Api {
        /// Error code reported by the API.
        code: i64,
        /// Human readable message reported by the API.
        message: String,
    },
}

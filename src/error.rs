//! Typed errors for the sync pipeline.
//!
//! Storage seams speak `anyhow::Result`; everything on the fetch-and-retry
//! path uses [`SyncError`] so callers can classify failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure: connect, DNS, timeout, broken body.
    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned HTTP status {status}")]
    HttpStatus { status: u16 },

    /// The provider answered 2xx but the body is not a valid response.
    #[error("failed to decode provider response: {message}")]
    Decode { message: String },

    /// Every attempt in the retry budget failed with a retriable error.
    /// Carries the final attempt's error as its source.
    #[error("max retry attempts exhausted after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<SyncError>,
    },

    /// The caller cancelled, or the overall retry deadline passed.
    /// `last_error` is the most recent attempt's failure, absent when
    /// cancellation happened before any attempt completed.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        attempts: u32,
        #[source]
        last_error: Option<Box<SyncError>>,
    },

    /// A document or state store rejected a read or write.
    #[error("persistence failure: {0}")]
    Persistence(anyhow::Error),

    /// Invalid configuration, caught before any network or storage call.
    #[error("invalid configuration: {message}")]
    ConfigValidation { message: String },
}

impl SyncError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn persistence(error: anyhow::Error) -> Self {
        Self::Persistence(error)
    }

    /// Maps a reqwest failure onto the right kind: body-decode failures are
    /// `Decode`, carried statuses are `HttpStatus`, the rest is transport.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::decode(error.to_string());
        }
        match error.status() {
            Some(status) => Self::HttpStatus {
                status: status.as_u16(),
            },
            None => Self::Network(error),
        }
    }

    /// Whether another attempt could plausibly succeed. Decode, config, and
    /// persistence failures are deterministic and never retried.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus { .. })
    }
}

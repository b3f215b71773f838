use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Envelope metadata returned alongside a data window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub source: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub total: Option<usize>,
    /// More pages exist beyond the returned window.
    #[serde(default)]
    pub has_more: bool,
}

/// A decoded provider response: an ordered window of records plus envelope
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse<T> {
    pub data: Vec<T>,
    pub timestamp: DateTime<Utc>,
    pub metadata: ResponseMetadata,
}

impl<T> ProviderResponse<T> {
    /// `metadata.count`, when present, must agree with the payload length.
    pub fn check_count(&self) -> Result<(), SyncError> {
        match self.metadata.count {
            Some(count) if count != self.data.len() => Err(SyncError::decode(format!(
                "metadata count {count} does not match {} returned records",
                self.data.len()
            ))),
            _ => Ok(()),
        }
    }
}

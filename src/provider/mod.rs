mod http;

pub use http::HttpProviderClient;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::SyncError;
use crate::models::{PriceRecord, ProviderResponse};

/// Pagination and scoping for a data-window fetch.
///
/// Absent fields are omitted from the request entirely; a limit or offset of
/// zero is treated the same as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataQuery {
    pub provider_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DataQuery {
    pub fn for_provider(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// An explicit historical window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoricalRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SyncError> {
        if end < start {
            return Err(SyncError::config(format!(
                "historical range end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }
}

/// Read-only health report for one provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub healthy: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub message: String,
}

/// Typed client for one external price-data provider.
///
/// A single instance carries no per-request state and is safe to share
/// across concurrent in-flight requests.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    /// Name identifying this provider in logs and cursor keys.
    fn name(&self) -> &str;

    /// Checks required configuration is present and well-formed, without
    /// touching the network.
    fn validate_config(&self) -> Result<(), SyncError>;

    /// The current price window.
    async fn fetch_current_data(
        &self,
        query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError>;

    /// The provider's previous publication window.
    async fn fetch_previous_data(
        &self,
        query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError>;

    /// Records within an explicit historical window.
    async fn fetch_historical_data(
        &self,
        range: HistoricalRange,
        query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError>;
}

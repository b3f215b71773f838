//! HTTP implementation of the provider client contract.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::SyncError;
use crate::models::{PriceRecord, ProviderResponse};

use super::{DataQuery, HistoricalRange, ProviderClient};

/// Provider client speaking the transparency-feed HTTP API:
/// `GET {base_url}/data/{current|previous|historical}` returning a JSON
/// envelope of price records.
pub struct HttpProviderClient {
    name: String,
    base_url: String,
    api_key: Option<SecretString>,
    client: Client,
}

impl HttpProviderClient {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: None,
            client: Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Replaces the endpoint base, used by tests to point at a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Query parameters, included only when meaningful: an empty provider id
    /// and a zero limit/offset are omitted rather than sent.
    fn window_params(query: &DataQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = &query.provider_id {
            if !id.is_empty() {
                params.push(("providerId", id.clone()));
            }
        }
        if let Some(limit) = query.limit {
            if limit > 0 {
                params.push(("limit", limit.to_string()));
            }
        }
        if let Some(offset) = query.offset {
            if offset > 0 {
                params.push(("offset", offset.to_string()));
            }
        }
        params
    }

    async fn fetch_window(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.validate_config()?;

        let url = self.endpoint(path);
        debug!(provider = %self.name, %url, "fetching provider window");

        let mut request = self.client.get(&url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.expose_secret());
        }

        let response = request.send().await.map_err(SyncError::from_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: ProviderResponse<PriceRecord> = response
            .json()
            .await
            .map_err(|err| SyncError::decode(err.to_string()))?;
        body.check_count()?;
        if let Some(record) = body.data.iter().find(|r| !r.has_valid_price()) {
            return Err(SyncError::decode(format!(
                "record '{}' carries negative price {}",
                record.id, record.price
            )));
        }

        Ok(body)
    }
}

#[async_trait::async_trait]
impl ProviderClient for HttpProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<(), SyncError> {
        if self.name.trim().is_empty() {
            return Err(SyncError::config("provider name is empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(SyncError::config(format!(
                "provider '{}' has no base_url",
                self.name
            )));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(SyncError::config(format!(
                "provider '{}' base_url '{}' is not an http(s) endpoint",
                self.name, self.base_url
            )));
        }
        if let Some(key) = &self.api_key {
            if key.expose_secret().trim().is_empty() {
                return Err(SyncError::config(format!(
                    "provider '{}' api_key is present but blank",
                    self.name
                )));
            }
        }
        Ok(())
    }

    async fn fetch_current_data(
        &self,
        query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.fetch_window("/data/current", Self::window_params(query))
            .await
    }

    async fn fetch_previous_data(
        &self,
        query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.fetch_window("/data/previous", Self::window_params(query))
            .await
    }

    async fn fetch_historical_data(
        &self,
        range: HistoricalRange,
        query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        let mut params = Self::window_params(query);
        params.push(("start", range.start.to_string()));
        params.push(("end", range.end.to_string()));
        self.fetch_window("/data/historical", params).await
    }
}

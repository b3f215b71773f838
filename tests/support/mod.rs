#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use chargebook::error::SyncError;
use chargebook::models::{PriceRecord, ProviderResponse, ResponseMetadata};
use chargebook::provider::{DataQuery, HistoricalRange, ProviderClient};
use chargebook::store::{DocumentStore, MemoryDocumentStore, QueryFilter, QueryOptions};

pub fn fixed_instant() -> DateTime<Utc> {
    "2024-01-15T12:00:00Z".parse().unwrap()
}

/// A record with deterministic content so batch identifiers are stable
/// across test runs.
pub fn record(id: &str, price: &str) -> PriceRecord {
    PriceRecord {
        id: id.to_string(),
        facility_name: "General Hospital".to_string(),
        procedure_code: "MRI-001".to_string(),
        procedure_description: "MRI scan, brain, without contrast".to_string(),
        price: Decimal::from_str(price).unwrap(),
        currency: "USD".to_string(),
        effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        last_updated: fixed_instant(),
        source: "scripted".to_string(),
        tags: BTreeSet::new(),
    }
}

pub fn record_with_tags(id: &str, price: &str, tags: &[&str]) -> PriceRecord {
    let mut rec = record(id, price);
    rec.tags = tags.iter().map(|t| t.to_string()).collect();
    rec
}

pub fn response(records: Vec<PriceRecord>) -> ProviderResponse<PriceRecord> {
    ProviderResponse {
        metadata: ResponseMetadata {
            source: "scripted".to_string(),
            count: Some(records.len()),
            total: Some(records.len()),
            has_more: false,
        },
        data: records,
        timestamp: fixed_instant(),
    }
}

/// JSON body in the provider wire shape, for wiremock responses.
pub fn response_body(records: &[PriceRecord]) -> serde_json::Value {
    json!({
        "data": serde_json::to_value(records).unwrap(),
        "timestamp": "2024-01-15T12:00:00Z",
        "metadata": {
            "source": "wiremock",
            "count": records.len(),
            "total": records.len(),
            "hasMore": false,
        },
    })
}

/// One scripted reply from the mock provider.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Records(Vec<PriceRecord>),
    Status(u16),
}

/// Provider client that replays a script instead of talking HTTP.
///
/// Steps are consumed in order; the last step repeats once the script runs
/// out, so "always returns 503" is a one-step script.
pub struct ScriptedProviderClient {
    name: String,
    steps: Mutex<VecDeque<ScriptStep>>,
    config_error: Option<String>,
    hold: Option<Duration>,
    cancel_on_fetch: Option<CancellationToken>,
    calls: AtomicU32,
    in_flight: AtomicI32,
    max_in_flight: AtomicI32,
}

impl ScriptedProviderClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Mutex::new(VecDeque::new()),
            config_error: None,
            hold: None,
            cancel_on_fetch: None,
            calls: AtomicU32::new(0),
            in_flight: AtomicI32::new(0),
            max_in_flight: AtomicI32::new(0),
        }
    }

    pub fn then_records(self, records: Vec<PriceRecord>) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(ScriptStep::Records(records));
        self
    }

    pub fn then_status(self, status: u16) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(ScriptStep::Status(status));
        self
    }

    pub fn with_config_error(mut self, message: impl Into<String>) -> Self {
        self.config_error = Some(message.into());
        self
    }

    /// Keeps each fetch in flight for `hold`, so overlap is observable.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Fires `token` just before each fetch returns, so cancellation lands
    /// after the fetch completes but before anything downstream runs.
    pub fn with_cancel_on_fetch(mut self, token: CancellationToken) -> Self {
        self.cancel_on_fetch = Some(token);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were ever in flight at once.
    pub fn max_in_flight(&self) -> i32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }

    async fn play(&self) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(hold) = self.hold {
            tokio::time::sleep(hold).await;
        }

        let result = match self.next_step() {
            Some(ScriptStep::Records(records)) => Ok(response(records)),
            Some(ScriptStep::Status(status)) => Err(SyncError::HttpStatus { status }),
            None => Ok(response(Vec::new())),
        };

        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ProviderClient for ScriptedProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<(), SyncError> {
        match &self.config_error {
            Some(message) => Err(SyncError::config(message.clone())),
            None => Ok(()),
        }
    }

    async fn fetch_current_data(
        &self,
        _query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.play().await
    }

    async fn fetch_previous_data(
        &self,
        _query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.play().await
    }

    async fn fetch_historical_data(
        &self,
        _range: HistoricalRange,
        _query: &DataQuery,
    ) -> Result<ProviderResponse<PriceRecord>, SyncError> {
        self.play().await
    }
}

/// Document store that fires a cancellation token after each successful
/// batch write, so the write lands but everything downstream sees the
/// cancellation.
pub struct CancelOnWriteStore {
    inner: Arc<MemoryDocumentStore>,
    cancel: CancellationToken,
}

impl CancelOnWriteStore {
    pub fn new(inner: Arc<MemoryDocumentStore>, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }
}

#[async_trait]
impl DocumentStore for CancelOnWriteStore {
    async fn put(&self, record: &PriceRecord) -> Result<()> {
        self.inner.put(record).await
    }

    async fn get(&self, id: &str) -> Result<Option<PriceRecord>> {
        self.inner.get(id).await
    }

    async fn query(
        &self,
        filter: &QueryFilter,
        options: &QueryOptions,
    ) -> Result<Vec<PriceRecord>> {
        self.inner.query(filter, options).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        self.inner.exists(id).await
    }

    async fn batch_put(&self, records: &[PriceRecord]) -> Result<()> {
        self.inner.batch_put(records).await?;
        self.cancel.cancel();
        Ok(())
    }

    fn store_name(&self) -> &str {
        self.inner.store_name()
    }
}

/// Document store whose writes always fail, for persistence-error paths.
pub struct FailingDocumentStore;

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn put(&self, _record: &PriceRecord) -> Result<()> {
        anyhow::bail!("write rejected")
    }

    async fn get(&self, _id: &str) -> Result<Option<PriceRecord>> {
        Ok(None)
    }

    async fn query(
        &self,
        _filter: &QueryFilter,
        _options: &QueryOptions,
    ) -> Result<Vec<PriceRecord>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn exists(&self, _id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn batch_put(&self, _records: &[PriceRecord]) -> Result<()> {
        anyhow::bail!("batch write rejected")
    }

    fn store_name(&self) -> &str {
        "failing"
    }
}

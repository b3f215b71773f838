//! Drives one sync attempt per provider: cursor read, retried fetch,
//! batch write, cursor advance.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::clock::{Clock, SystemClock};
use crate::error::SyncError;
use crate::models::{PriceRecord, ProviderResponse};
use crate::provider::{DataQuery, ProviderClient, ProviderHealth};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::state::ProviderStateStore;
use crate::store::DocumentStore;

use super::{SyncOutcome, SyncPhase};

/// Coordinates fetch, persist, and cursor advance for registered providers.
///
/// Syncs for different providers run fully in parallel; syncs for the same
/// provider are serialized through a per-name lock, because the cursor's
/// read-modify-write is not atomic against a concurrent writer. The cursor
/// is advanced last, so a failure in any earlier phase leaves the stored
/// state exactly where the previous successful sync put it.
pub struct SyncOrchestrator {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
    documents: Arc<dyn DocumentStore>,
    state: Arc<dyn ProviderStateStore>,
    retry: RetryExecutor,
    retry_config: RetryConfig,
    clock: Arc<dyn Clock>,
    locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncOrchestrator {
    pub fn new(documents: Arc<dyn DocumentStore>, state: Arc<dyn ProviderStateStore>) -> Self {
        Self {
            providers: HashMap::new(),
            documents,
            state,
            retry: RetryExecutor::new(),
            retry_config: RetryConfig::default(),
            clock: Arc::new(SystemClock),
            locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn with_provider(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.providers.insert(client.name().to_string(), client);
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Runs one sync attempt for `provider_name`. All failures fold into
    /// the returned outcome; nothing escapes as a panic or a bare error.
    pub async fn sync(&self, provider_name: &str) -> SyncOutcome {
        self.sync_with_cancellation(provider_name, &CancellationToken::new())
            .await
    }

    /// Like [`sync`](Self::sync), aborting promptly when `cancel` fires.
    /// Cancellation mid-fetch has no write side effects; cancellation after
    /// the write is not rolled back (writes are idempotent by id) but is
    /// still reported as a failure, never success.
    pub async fn sync_with_cancellation(
        &self,
        provider_name: &str,
        cancel: &CancellationToken,
    ) -> SyncOutcome {
        // Serialize same-provider syncs for the full fetch-to-cursor span.
        let lock = self.lock_for(provider_name).await;
        let _guard = lock.lock().await;

        let span = tracing::info_span!("provider_sync", provider = provider_name);
        async {
            match self.run_sync(provider_name, cancel).await {
                Ok(records_processed) => {
                    info!(records_processed, "sync complete");
                    SyncOutcome::succeeded(records_processed, self.clock.now())
                }
                Err(err) => {
                    warn!(phase = ?SyncPhase::Failed, error = %err, "sync failed");
                    SyncOutcome::failed(err.to_string(), self.clock.now())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_sync(
        &self,
        provider_name: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let client = self
            .providers
            .get(provider_name)
            .cloned()
            .ok_or_else(|| SyncError::config(format!("unknown provider '{provider_name}'")))?;
        client.validate_config()?;
        debug!(phase = ?SyncPhase::Idle, "sync starting");

        // Idle -> Fetching. An absent cursor is the zero value: first sync.
        let state = self
            .state
            .get_state(provider_name)
            .await
            .map_err(SyncError::persistence)?
            .unwrap_or_default();

        debug!(phase = ?SyncPhase::Fetching, last_batch = state.last_batch_id.as_deref());
        let query = DataQuery::default();
        let response = self
            .retry
            .run_observed(
                &self.retry_config,
                cancel,
                |_attempt| {
                    let client = Arc::clone(&client);
                    let query = query.clone();
                    async move { client.fetch_current_data(&query).await }
                },
                |attempt, error, next_delay| {
                    warn!(
                        attempt,
                        next_delay_ms = next_delay.as_millis() as u64,
                        error = %error,
                        "fetch attempt failed, retrying"
                    );
                },
            )
            .await?;

        // Fetching -> Persisting.
        ensure_not_cancelled(cancel)?;
        debug!(phase = ?SyncPhase::Persisting, records = response.data.len());
        self.documents
            .batch_put(&response.data)
            .await
            .map_err(SyncError::persistence)?;

        // Persisting -> AdvancingCursor. The write above may survive a
        // cancellation here; the cursor must not, so the run still fails.
        ensure_not_cancelled(cancel)?;
        let batch_id = batch_id(provider_name, &response);
        let next = state.advanced(batch_id, self.clock.now());
        debug!(phase = ?SyncPhase::AdvancingCursor, batch = next.last_batch_id.as_deref());
        self.state
            .save_state(provider_name, &next)
            .await
            .map_err(SyncError::persistence)?;

        Ok(response.data.len())
    }

    /// Read-only health report: config validity plus the stored cursor.
    pub async fn health_check(&self, provider_name: &str) -> ProviderHealth {
        let Some(client) = self.providers.get(provider_name) else {
            return ProviderHealth {
                healthy: false,
                last_sync: None,
                message: format!("unknown provider '{provider_name}'"),
            };
        };

        if let Err(err) = client.validate_config() {
            return ProviderHealth {
                healthy: false,
                last_sync: None,
                message: err.to_string(),
            };
        }

        match self.state.get_state(provider_name).await {
            Ok(Some(state)) => ProviderHealth {
                healthy: true,
                last_sync: state.last_sync_date,
                message: "ok".to_string(),
            },
            Ok(None) => ProviderHealth {
                healthy: true,
                last_sync: None,
                message: "never synced".to_string(),
            },
            Err(err) => ProviderHealth {
                healthy: false,
                last_sync: None,
                message: format!("state store unavailable: {err}"),
            },
        }
    }

    async fn lock_for(&self, provider_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(provider_name.to_string())
            .or_default()
            .clone()
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), SyncError> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled {
            attempts: 0,
            last_error: None,
        });
    }
    Ok(())
}

/// Batch identifier for one fetched window: SHA-256 over the provider name
/// and each record's id and last-updated instant, in response order, hex,
/// truncated to 16 characters. An unchanged upstream dataset reproduces the
/// same id.
fn batch_id(provider_name: &str, response: &ProviderResponse<PriceRecord>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider_name.as_bytes());
    for record in &response.data {
        hasher.update([0]);
        hasher.update(record.id.as_bytes());
        hasher.update([0]);
        hasher.update(record.last_updated.to_rfc3339().as_bytes());
    }
    let digest = hasher.finalize();
    digest[..8].iter().map(|byte| format!("{byte:02x}")).collect()
}

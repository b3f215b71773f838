mod json_file;

pub use json_file::JsonFileStateStore;

use std::collections::HashMap;

use anyhow::Result;

use crate::models::ProviderState;

/// Durable key-value store of per-provider sync cursors.
///
/// `save_state` fully overwrites the stored cursor; preserving the
/// two-generation batch history is the caller's read-modify-write job.
/// There is no optimistic concurrency here; the orchestrator serializes
/// writers per provider name.
#[async_trait::async_trait]
pub trait ProviderStateStore: Send + Sync {
    /// `None` when the provider has never completed a sync.
    async fn get_state(&self, provider: &str) -> Result<Option<ProviderState>>;

    async fn save_state(&self, provider: &str, state: &ProviderState) -> Result<()>;
}

/// In-memory cursor store for tests and embedders without a data directory.
#[derive(Default)]
pub struct MemoryStateStore {
    states: tokio::sync::Mutex<HashMap<String, ProviderState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProviderStateStore for MemoryStateStore {
    async fn get_state(&self, provider: &str) -> Result<Option<ProviderState>> {
        let states = self.states.lock().await;
        Ok(states.get(provider).cloned())
    }

    async fn save_state(&self, provider: &str, state: &ProviderState) -> Result<()> {
        let mut states = self.states.lock().await;
        states.insert(provider.to_string(), state.clone());
        Ok(())
    }
}

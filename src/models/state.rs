use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-provider sync cursor.
///
/// `previous_batch_id` is always the `last_batch_id` that stood immediately
/// before the most recent successful sync: two generations of history, not a
/// log. All fields are JSON-serializable scalars so the cursor can live in
/// any key-value backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_batch_id: Option<String>,
}

impl ProviderState {
    /// The cursor after a fully successful sync: the old `last_batch_id`
    /// shifts down a generation, the new batch takes its place.
    pub fn advanced(&self, batch_id: String, now: DateTime<Utc>) -> Self {
        Self {
            last_sync_date: Some(now),
            previous_batch_id: self.last_batch_id.clone(),
            last_batch_id: Some(batch_id),
        }
    }
}

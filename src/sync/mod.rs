mod orchestrator;

pub use orchestrator::SyncOrchestrator;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one sync attempt, returned to the trigger and never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    pub records_processed: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn succeeded(records_processed: usize, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            records_processed,
            timestamp,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            records_processed: 0,
            timestamp,
            error: Some(error.into()),
        }
    }
}

/// Phases of one sync attempt. An error in any phase short-circuits to
/// `Failed`; later phases run no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Persisting,
    AdvancingCursor,
    Failed,
}

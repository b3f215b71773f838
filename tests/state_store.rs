use chrono::Utc;
use tempfile::tempdir;

use chargebook::models::ProviderState;
use chargebook::state::{JsonFileStateStore, MemoryStateStore, ProviderStateStore};

fn sample_state() -> ProviderState {
    ProviderState {
        last_sync_date: Some(Utc::now()),
        last_batch_id: Some("batch-a".to_string()),
        previous_batch_id: None,
    }
}

#[tokio::test]
async fn absent_provider_is_none_not_an_error() {
    let dir = tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path());

    let state = store.get_state("never-synced").await.unwrap();
    assert!(state.is_none());
}

#[tokio::test]
async fn json_file_roundtrip() {
    let dir = tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path());
    let state = sample_state();

    store.save_state("demo", &state).await.unwrap();
    let loaded = store.get_state("demo").await.unwrap().unwrap();
    assert_eq!(loaded, state);

    // The cursor lives where the layout says it does.
    assert!(dir.path().join("providers/demo/state.json").is_file());
}

#[tokio::test]
async fn save_is_a_full_overwrite_not_a_merge() {
    let dir = tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path());

    let full = ProviderState {
        last_sync_date: Some(Utc::now()),
        last_batch_id: Some("batch-b".to_string()),
        previous_batch_id: Some("batch-a".to_string()),
    };
    store.save_state("demo", &full).await.unwrap();

    let partial = ProviderState {
        last_sync_date: None,
        last_batch_id: Some("batch-c".to_string()),
        previous_batch_id: None,
    };
    store.save_state("demo", &partial).await.unwrap();

    let loaded = store.get_state("demo").await.unwrap().unwrap();
    assert_eq!(loaded, partial);
    assert!(loaded.previous_batch_id.is_none());
}

#[tokio::test]
async fn states_are_independent_per_provider() {
    let dir = tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path());

    store.save_state("alpha", &sample_state()).await.unwrap();
    assert!(store.get_state("beta").await.unwrap().is_none());
}

#[tokio::test]
async fn path_traversal_provider_names_are_rejected() {
    let dir = tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path());

    for name in ["", ".", "..", "a/b", "a\\b"] {
        assert!(
            store.save_state(name, &sample_state()).await.is_err(),
            "expected rejection for {name:?}"
        );
        assert!(store.get_state(name).await.is_err());
    }
}

#[tokio::test]
async fn memory_store_roundtrip() {
    let store = MemoryStateStore::new();
    assert!(store.get_state("demo").await.unwrap().is_none());

    let state = sample_state();
    store.save_state("demo", &state).await.unwrap();
    assert_eq!(store.get_state("demo").await.unwrap().unwrap(), state);
}

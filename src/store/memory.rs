use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;

use crate::models::PriceRecord;

use super::{DocumentStore, QueryFilter, QueryOptions, SortField, SortOrder};

/// In-memory document store, the stand-in for the external backend in tests
/// and single-process deployments.
#[derive(Default)]
pub struct MemoryDocumentStore {
    records: tokio::sync::Mutex<HashMap<String, PriceRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, mainly for assertions.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

fn compare(a: &PriceRecord, b: &PriceRecord, field: SortField) -> Ordering {
    let by_field = match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Price => a.price.cmp(&b.price),
        SortField::EffectiveDate => a.effective_date.cmp(&b.effective_date),
        SortField::LastUpdated => a.last_updated.cmp(&b.last_updated),
    };
    // Tie-break on id so ordering is total and stable across runs.
    by_field.then_with(|| a.id.cmp(&b.id))
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, record: &PriceRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PriceRecord>> {
        let records = self.records.lock().await;
        Ok(records.get(id).cloned())
    }

    async fn query(&self, filter: &QueryFilter, options: &QueryOptions) -> Result<Vec<PriceRecord>> {
        let records = self.records.lock().await;
        let mut matched: Vec<PriceRecord> = records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        let field = options.sort_by.unwrap_or(SortField::Id);
        matched.sort_by(|a, b| match options.sort_order {
            SortOrder::Ascending => compare(a, b, field),
            SortOrder::Descending => compare(b, a, field),
        });

        let iter = matched.into_iter().skip(options.offset);
        Ok(match options.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        Ok(records.remove(id).is_some())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let records = self.records.lock().await;
        Ok(records.contains_key(id))
    }

    async fn batch_put(&self, records: &[PriceRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut store = self.records.lock().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

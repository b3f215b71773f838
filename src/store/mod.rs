mod memory;

pub use memory::MemoryDocumentStore;

use anyhow::Result;

use crate::models::PriceRecord;

/// Closed set of filter operators the document-store contract supports.
///
/// Backends translate these into whatever their query language offers; the
/// contract deliberately does not accept arbitrary field/operator maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    All,
    FacilityEquals(String),
    ProcedureCodeEquals(String),
    SourceEquals(String),
    TagContains(String),
}

impl QueryFilter {
    pub fn matches(&self, record: &PriceRecord) -> bool {
        match self {
            Self::All => true,
            Self::FacilityEquals(name) => record.facility_name == *name,
            Self::ProcedureCodeEquals(code) => record.procedure_code == *code,
            Self::SourceEquals(source) => record.source == *source,
            Self::TagContains(tag) => record.tags.contains(tag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Price,
    EffectiveDate,
    LastUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort_by: Option<SortField>,
    pub sort_order: SortOrder,
}

/// Narrow contract of the external document store.
///
/// Records are keyed by their `id`; writing the same id with the same
/// content is a no-op, which is what lets the orchestrator re-run a sync
/// without rollback machinery.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, record: &PriceRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<PriceRecord>>;

    async fn query(&self, filter: &QueryFilter, options: &QueryOptions) -> Result<Vec<PriceRecord>>;

    /// Returns whether a record was present.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn exists(&self, id: &str) -> Result<bool>;

    async fn batch_put(&self, records: &[PriceRecord]) -> Result<()>;

    fn store_name(&self) -> &str;
}

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One published price for a procedure at a facility.
///
/// Immutable once fetched. `id` is the natural dedup key in the document
/// store: rewriting the same id with the same content is observably a no-op,
/// which is what makes re-running a sync safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub id: String,
    pub facility_name: String,
    pub procedure_code: String,
    pub procedure_description: String,
    pub price: Decimal,
    pub currency: String,
    pub effective_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl PriceRecord {
    /// Prices are amounts owed; a negative value is a provider bug, not data.
    pub fn has_valid_price(&self) -> bool {
        self.price >= Decimal::ZERO
    }
}

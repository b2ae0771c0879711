//! Batch reports

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SheetResult;

/// One refreshed result, as displayed
#[derive(Debug, Clone, Serialize)]
pub struct EntityResult {
    pub name: String,
    pub text: String,
}

/// What a batch did: identity, timing, and every result it produced in
/// document order. Serializes for logs and frontends.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub cancelled: bool,
    pub computed: Vec<EntityResult>,
}

impl BatchSummary {
    pub fn to_json(&self) -> SheetResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

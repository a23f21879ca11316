use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted content record, independent of its content kind.
///
/// Serializes as the raw (unlocalized) view used by management screens:
/// every stored field at the top level next to `id` and the timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Write counter used to detect concurrent modification.
    #[serde(skip)]
    pub revision: i64,
}

/// Exact-match predicate over record fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter(BTreeMap<String, Value>);

impl RecordFilter {
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// A missing field never matches.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| fields.get(key) == Some(expected))
    }
}

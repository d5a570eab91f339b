//! In-memory source store
//!
//! File shape:
//!
//! ```json
//! { "sources": { "people": [ {...}, ... ],
//!                "orders": { "rows": [ {...} ], "fields": ["id", "total"] } } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::executor::{SourceData, SourceProvider};
use crate::predicate::Row;

use super::errors::{StoreError, StoreResult};
use super::events::read_json;

#[derive(Debug, Clone, Default)]
pub struct MemorySourceStore {
    sources: BTreeMap<String, SourceData>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a source
    pub fn insert(&mut self, source_id: impl Into<String>, data: SourceData) {
        self.sources.insert(source_id.into(), data);
    }

    pub fn with_source(mut self, source_id: impl Into<String>, data: SourceData) -> Self {
        self.insert(source_id, data);
        self
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn from_value(value: &Value) -> StoreResult<Self> {
        let sources = value
            .get("sources")
            .and_then(Value::as_object)
            .ok_or_else(|| StoreError::decode_failed("expected a 'sources' object"))?;

        let mut store = Self::new();
        for (id, entry) in sources {
            store.insert(id.clone(), decode_source(id, entry)?);
        }
        Ok(store)
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        Self::from_value(&read_json(path)?)
    }
}

impl SourceProvider for MemorySourceStore {
    fn source(&self, source_id: &str) -> Option<SourceData> {
        self.sources.get(source_id).cloned()
    }
}

fn decode_source(id: &str, entry: &Value) -> StoreResult<SourceData> {
    match entry {
        Value::Array(items) => Ok(SourceData::new(decode_rows(id, items)?)),
        Value::Object(obj) => {
            let rows = obj
                .get("rows")
                .and_then(Value::as_array)
                .ok_or_else(|| StoreError::decode_failed_for(id, "'rows' must be an array"))?;
            let mut data = SourceData::new(decode_rows(id, rows)?);
            if let Some(fields) = obj.get("fields").filter(|v| !v.is_null()) {
                let fields: Vec<String> = serde_json::from_value(fields.clone()).map_err(|e| {
                    StoreError::decode_failed_for(id, format!("invalid 'fields': {}", e))
                })?;
                data = data.with_fields(fields);
            }
            Ok(data)
        }
        _ => Err(StoreError::decode_failed_for(
            id,
            "source must be a row array or an object with 'rows'",
        )),
    }
}

fn decode_rows(id: &str, items: &[Value]) -> StoreResult<Vec<Row>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object().cloned().ok_or_else(|| {
                StoreError::decode_failed_for(id, format!("row {} is not an object", i))
            })
        })
        .collect()
}

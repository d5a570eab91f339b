//! Source supply and per-execution context

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::predicate::Row;

/// Rows of one source plus its declared field list, if any
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl SourceData {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows, fields: None }
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Declared fields, or every key seen across rows in first-seen order
    pub fn columns(&self) -> Vec<String> {
        if let Some(fields) = &self.fields {
            return fields.clone();
        }
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }
}

/// Supplies row collections by source id
pub trait SourceProvider {
    /// Returns the source, or `None` if it does not exist
    fn source(&self, source_id: &str) -> Option<SourceData>;
}

/// State threaded through one execution call
#[derive(Debug)]
pub struct ExecutionContext {
    registered: BTreeMap<String, SourceData>,
    hidden: Vec<Row>,
    name: Option<String>,
    now: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            registered: BTreeMap::new(),
            hidden: Vec::new(),
            name: None,
            now,
        }
    }

    /// Register a source under its id and, when given, an alias
    pub fn register(&mut self, source_id: &str, alias: Option<&str>, data: SourceData) {
        if let Some(alias) = alias {
            self.registered.insert(alias.to_string(), data.clone());
        }
        self.registered.insert(source_id.to_string(), data);
    }

    /// Registered source by id or alias
    pub fn registered(&self, key: &str) -> Option<&SourceData> {
        self.registered.get(key)
    }

    pub fn hide(&mut self, rows: impl IntoIterator<Item = Row>) {
        self.hidden.extend(rows);
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Instant a dynamic "now" resolves to for this execution
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub(crate) fn into_parts(self) -> (Vec<Row>, Option<String>) {
        (self.hidden, self.name)
    }
}

//! Result types for chain execution

use serde::Serialize;
use serde_json::Value;

use crate::epistemic::EpistemicType;
use crate::operator::OperatorKind;
use crate::predicate::Row;

/// Row counts around one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub index: usize,
    pub operator: OperatorKind,
    pub input_rows: usize,
    pub output_rows: usize,
}

/// Materialized output of a chain
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Output rows in emission order
    pub rows: Vec<Row>,
    /// Output column names in order
    pub columns: Vec<String>,
    /// Per-step diagnostics
    pub steps: Vec<StepStats>,
    /// Rows set aside by hidden restrictions; they still exist
    pub hidden_rows: Vec<Row>,
    pub name: Option<String>,
    pub produced_type: EpistemicType,
}

impl ExecutionResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column in row order, null where absent
    pub fn column(&self, name: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|r| r.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

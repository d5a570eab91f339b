//! Predicate tree and its structural form
//!
//! ```json
//! {"type": "AND", "predicates": [
//!   {"type": "COMPARISON", "field": "status", "operator": "eq", "value": "active"},
//!   {"type": "NOT", "predicate": {"type": "COMPARISON", "field": "amount", "operator": "lt", "value": 100}}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{PredicateError, PredicateResult};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Inclusive numeric range, value is `[low, high]`
    Between,
    /// Case-insensitive membership, value is an array or a comma list
    In,
    NotIn,
    /// Null, missing or empty string
    IsNull,
    IsNotNull,
    /// Case-insensitive regular expression
    Matches,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Contains => "contains",
            CompareOp::NotContains => "not_contains",
            CompareOp::StartsWith => "starts_with",
            CompareOp::EndsWith => "ends_with",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Between => "between",
            CompareOp::In => "in",
            CompareOp::NotIn => "not_in",
            CompareOp::IsNull => "is_null",
            CompareOp::IsNotNull => "is_not_null",
            CompareOp::Matches => "matches",
        }
    }
}

/// Recursive boolean expression over row fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Predicate {
    And {
        predicates: Vec<Predicate>,
    },
    Or {
        predicates: Vec<Predicate>,
    },
    Not {
        predicate: Box<Predicate>,
    },
    Comparison {
        field: String,
        operator: CompareOp,
        #[serde(default)]
        value: Value,
    },
}

impl Predicate {
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And { predicates }
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or { predicates }
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not {
            predicate: Box::new(predicate),
        }
    }

    pub fn compare(field: impl Into<String>, operator: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Comparison {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Neq, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Contains, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::StartsWith, value)
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::EndsWith, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn between(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::compare(
            field,
            CompareOp::Between,
            Value::Array(vec![low.into(), high.into()]),
        )
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::compare(
            field,
            CompareOp::In,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::IsNotNull, Value::Null)
    }

    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::Matches, Value::String(pattern.into()))
    }

    /// Plain structural form
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parses and checks the structural form
    pub fn from_value(value: &Value) -> PredicateResult<Self> {
        let predicate: Predicate = serde_json::from_value(value.clone())
            .map_err(|e| PredicateError::invalid("$", e.to_string()))?;
        predicate.check("$")?;
        Ok(predicate)
    }

    /// Rejects operand shapes that could never evaluate meaningfully
    pub fn check(&self, path: &str) -> PredicateResult<()> {
        match self {
            Predicate::And { predicates } | Predicate::Or { predicates } => {
                for (i, p) in predicates.iter().enumerate() {
                    p.check(&format!("{}.predicates[{}]", path, i))?;
                }
                Ok(())
            }
            Predicate::Not { predicate } => predicate.check(&format!("{}.predicate", path)),
            Predicate::Comparison {
                field,
                operator,
                value,
            } => {
                if field.trim().is_empty() {
                    return Err(PredicateError::invalid(
                        format!("{}.field", path),
                        "comparison field is empty",
                    ));
                }
                match operator {
                    CompareOp::Between => match value.as_array() {
                        Some(bounds) if bounds.len() == 2 => Ok(()),
                        _ => Err(PredicateError::invalid(
                            format!("{}.value", path),
                            "between expects [low, high]",
                        )),
                    },
                    CompareOp::In | CompareOp::NotIn => {
                        if value.is_array() || value.is_string() {
                            Ok(())
                        } else {
                            Err(PredicateError::invalid(
                                format!("{}.value", path),
                                "in expects an array or a comma-separated string",
                            ))
                        }
                    }
                    CompareOp::Matches if !value.is_string() => Err(PredicateError::invalid(
                        format!("{}.value", path),
                        "matches expects a pattern string",
                    )),
                    _ => Ok(()),
                }
            }
        }
    }
}

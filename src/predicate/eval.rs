//! Predicate evaluation against rows
//!
//! Coercion rules:
//! - Equality, containment, prefix, suffix, membership: both sides lower-cased strings
//! - Ordering and ranges: both sides numeric; a non-numeric operand makes the
//!   comparison false rather than an error
//! - Null operators: null, missing or empty string count as null
//!
//! A missing field reads as null. `matches` patterns are compiled once per
//! `compile()`; an invalid pattern never matches.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::ast::{CompareOp, Predicate};

/// A single row: field name to value
pub type Row = Map<String, Value>;

/// Compiled `matches` patterns keyed by source; `None` marks an invalid pattern
type Patterns<'p> = HashMap<&'p str, Option<Regex>>;

/// A predicate with every `matches` pattern compiled once, for evaluating
/// many rows
pub struct CompiledPredicate<'p> {
    predicate: &'p Predicate,
    patterns: Patterns<'p>,
}

impl CompiledPredicate<'_> {
    pub fn evaluate(&self, row: &Row) -> bool {
        evaluate(self.predicate, row, &self.patterns)
    }

    /// Number of distinct patterns compiled
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Predicate {
    /// Evaluates the predicate against a row
    pub fn evaluate(&self, row: &Row) -> bool {
        self.compile().evaluate(row)
    }

    /// Compiles `matches` patterns up front
    pub fn compile(&self) -> CompiledPredicate<'_> {
        let mut patterns = HashMap::new();
        collect_patterns(self, &mut patterns);
        CompiledPredicate {
            predicate: self,
            patterns,
        }
    }
}

fn collect_patterns<'p>(predicate: &'p Predicate, out: &mut Patterns<'p>) {
    match predicate {
        Predicate::And { predicates } | Predicate::Or { predicates } => {
            for p in predicates {
                collect_patterns(p, out);
            }
        }
        Predicate::Not { predicate } => collect_patterns(predicate, out),
        Predicate::Comparison {
            operator: CompareOp::Matches,
            value: Value::String(pattern),
            ..
        } => {
            out.entry(pattern.as_str()).or_insert_with(|| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
            });
        }
        Predicate::Comparison { .. } => {}
    }
}

fn evaluate(predicate: &Predicate, row: &Row, patterns: &Patterns<'_>) -> bool {
    match predicate {
        Predicate::And { predicates } => predicates.iter().all(|p| evaluate(p, row, patterns)),
        Predicate::Or { predicates } => predicates.iter().any(|p| evaluate(p, row, patterns)),
        Predicate::Not { predicate } => !evaluate(predicate, row, patterns),
        Predicate::Comparison {
            field,
            operator: CompareOp::Matches,
            value,
        } => {
            let regex = value
                .as_str()
                .and_then(|pattern| patterns.get(pattern))
                .and_then(Option::as_ref);
            match regex {
                Some(re) => {
                    let actual = lookup(row, field);
                    let subject = match actual {
                        Some(Value::String(s)) => s.clone(),
                        other => coerce_string(other),
                    };
                    re.is_match(&subject)
                }
                None => false,
            }
        }
        Predicate::Comparison {
            field,
            operator,
            value,
        } => compare(lookup(row, field), *operator, value),
    }
}

/// Reads a field, falling back to a dotted path into nested objects
pub fn lookup<'r>(row: &'r Row, field: &str) -> Option<&'r Value> {
    if let Some(v) = row.get(field) {
        return Some(v);
    }
    if !field.contains('.') {
        return None;
    }
    let mut parts = field.split('.');
    let mut current = row.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Lower-cased string form used by the string operators
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Numeric form used by the ordering operators
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

/// True for null, missing or empty string
pub fn is_nullish(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn compare(actual: Option<&Value>, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::IsNull => is_nullish(actual),
        CompareOp::IsNotNull => !is_nullish(actual),

        CompareOp::Eq => coerce_string(actual) == coerce_string(Some(expected)),
        CompareOp::Neq => coerce_string(actual) != coerce_string(Some(expected)),
        CompareOp::Contains => coerce_string(actual).contains(&coerce_string(Some(expected))),
        CompareOp::NotContains => !coerce_string(actual).contains(&coerce_string(Some(expected))),
        CompareOp::StartsWith => coerce_string(actual).starts_with(&coerce_string(Some(expected))),
        CompareOp::EndsWith => coerce_string(actual).ends_with(&coerce_string(Some(expected))),

        CompareOp::Gt => ordered(actual, expected, |a, b| a > b),
        CompareOp::Gte => ordered(actual, expected, |a, b| a >= b),
        CompareOp::Lt => ordered(actual, expected, |a, b| a < b),
        CompareOp::Lte => ordered(actual, expected, |a, b| a <= b),
        CompareOp::Between => between(actual, expected),

        CompareOp::In => member_of(actual, expected),
        CompareOp::NotIn => !member_of(actual, expected),

        // compiled ahead of time; see `evaluate`
        CompareOp::Matches => false,
    }
}

fn ordered(actual: Option<&Value>, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (coerce_number(actual), coerce_number(Some(expected))) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn between(actual: Option<&Value>, bounds: &Value) -> bool {
    let (low, high) = match bounds.as_array().map(Vec::as_slice) {
        Some([low, high]) => (low, high),
        _ => return false,
    };
    match (
        coerce_number(actual),
        coerce_number(Some(low)),
        coerce_number(Some(high)),
    ) {
        (Some(v), Some(lo), Some(hi)) => v >= lo && v <= hi,
        _ => false,
    }
}

fn member_of(actual: Option<&Value>, candidates: &Value) -> bool {
    let needle = coerce_string(actual);
    match candidates {
        Value::Array(items) => items.iter().any(|c| coerce_string(Some(c)) == needle),
        Value::String(list) => list.split(',').any(|c| c.trim().to_lowercase() == needle),
        other => coerce_string(Some(other)) == needle,
    }
}

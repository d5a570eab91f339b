//! Grouping and aggregate functions
//!
//! Rows are partitioned by the composite group key. Missing or null key
//! parts share one null sentinel so they group together instead of being
//! dropped. Groups are emitted in first-appearance order.

use std::collections::HashMap;

use serde_json::{json, Number, Value};

use crate::operator::{AggregateFn, AggregateParams, Aggregation};
use crate::predicate::{coerce_number, is_nullish, lookup, Row};

const NULL_SENTINEL: &str = "\u{0}null";

fn group_key(row: &Row, group_by: &[String]) -> Vec<String> {
    group_by
        .iter()
        .map(|f| match lookup(row, f) {
            None | Some(Value::Null) => NULL_SENTINEL.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })
        .collect()
}

/// Output columns: group fields then aggregation aliases
pub fn aggregate_columns(params: &AggregateParams) -> Vec<String> {
    params
        .group_by
        .iter()
        .cloned()
        .chain(params.aggregations.iter().map(|a| a.alias.clone()))
        .collect()
}

pub fn aggregate(rows: &[Row], params: &AggregateParams) -> Vec<Row> {
    let mut order: Vec<Vec<String>> = Vec::new();
    let mut groups: HashMap<Vec<String>, Vec<&Row>> = HashMap::new();

    if params.group_by.is_empty() {
        order.push(Vec::new());
        groups.insert(Vec::new(), rows.iter().collect());
    } else {
        for row in rows {
            let key = group_key(row, &params.group_by);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(row);
        }
    }

    order
        .iter()
        .filter_map(|key| groups.get(key))
        .map(|members| {
            let mut out = Row::new();
            for field in &params.group_by {
                let value = members
                    .first()
                    .and_then(|r| lookup(r, field))
                    .cloned()
                    .unwrap_or(Value::Null);
                out.insert(field.clone(), value);
            }
            for aggregation in &params.aggregations {
                out.insert(aggregation.alias.clone(), compute(members, aggregation));
            }
            out
        })
        .collect()
}

fn compute(members: &[&Row], aggregation: &Aggregation) -> Value {
    let field = match (&aggregation.field, aggregation.function) {
        (None, AggregateFn::Count) => return json!(members.len()),
        (None, _) => return Value::Null,
        (Some(field), _) => field.as_str(),
    };

    let numbers = || {
        members
            .iter()
            .filter_map(|r| coerce_number(lookup(r, field)))
            .collect::<Vec<f64>>()
    };

    match aggregation.function {
        AggregateFn::Count => json!(members
            .iter()
            .filter(|r| !is_nullish(lookup(r, field)))
            .count()),
        AggregateFn::Sum => {
            let values = numbers();
            if values.is_empty() {
                Value::Null
            } else {
                number_value(values.iter().sum())
            }
        }
        AggregateFn::Avg => {
            let values = numbers();
            if values.is_empty() {
                Value::Null
            } else {
                number_value(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        AggregateFn::Min => numbers()
            .into_iter()
            .reduce(f64::min)
            .map_or(Value::Null, number_value),
        AggregateFn::Max => numbers()
            .into_iter()
            .reduce(f64::max)
            .map_or(Value::Null, number_value),
        AggregateFn::First => members
            .first()
            .and_then(|r| lookup(r, field))
            .cloned()
            .unwrap_or(Value::Null),
        AggregateFn::Last => members
            .last()
            .and_then(|r| lookup(r, field))
            .cloned()
            .unwrap_or(Value::Null),
    }
}

/// Integral results stay integers in the output
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        json!(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

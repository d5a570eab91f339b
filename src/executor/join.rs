//! Hash join under an explicit conflict policy
//!
//! The right side is indexed by its lower-cased join key. Null or empty keys
//! never match. Right columns that collide with left columns are prefixed
//! with the right source id.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::operator::{ConflictPolicy, JoinParams};
use crate::predicate::{coerce_string, is_nullish, lookup, Row};

use super::sorter::RowSorter;

pub const MATCHES_COLUMN: &str = "_matches";
pub const MATCH_COUNT_COLUMN: &str = "_match_count";
pub const MULTIPLE_COLUMN: &str = "_multiple";

/// Output of one join
pub struct Joined {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
}

fn join_key(row: &Row, field: &str) -> Option<String> {
    let value = lookup(row, field);
    if is_nullish(value) {
        None
    } else {
        Some(coerce_string(value))
    }
}

/// Right column name to output column name
fn rename_right(params: &JoinParams, left_columns: &[String], right_columns: &[String]) -> Vec<(String, String)> {
    right_columns
        .iter()
        .map(|c| {
            let out = if left_columns.contains(c) {
                format!("{}.{}", params.right_source, c)
            } else {
                c.clone()
            };
            (c.clone(), out)
        })
        .collect()
}

pub fn hash_join(
    left_rows: &[Row],
    left_columns: &[String],
    right_rows: &[Row],
    right_columns: &[String],
    params: &JoinParams,
    policy: ConflictPolicy,
) -> Joined {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right_rows.iter().enumerate() {
        if let Some(key) = join_key(row, &params.right_field) {
            index.entry(key).or_default().push(i);
        }
    }

    let renamed = rename_right(params, left_columns, right_columns);
    let flattens = !matches!(policy, ConflictPolicy::Cluster);

    let mut columns: Vec<String> = left_columns.to_vec();
    if flattens {
        columns.extend(renamed.iter().map(|(_, out)| out.clone()));
    }
    match policy {
        ConflictPolicy::Cluster => {
            columns.push(MATCHES_COLUMN.to_string());
            columns.push(MATCH_COUNT_COLUMN.to_string());
            columns.push(MULTIPLE_COLUMN.to_string());
        }
        ConflictPolicy::Aggregate => columns.push(MATCH_COUNT_COLUMN.to_string()),
        _ => {}
    }

    let mut matched_right = vec![false; right_rows.len()];
    let mut rows = Vec::new();

    for left in left_rows {
        let hits: Vec<usize> = join_key(left, &params.left_field)
            .and_then(|k| index.get(&k).cloned())
            .unwrap_or_default();
        for &i in &hits {
            matched_right[i] = true;
        }

        if hits.is_empty() {
            if params.kind.keeps_unmatched_left() {
                rows.push(unmatched_left(left, &renamed, policy));
            }
            continue;
        }

        let mut matches: Vec<&Row> = hits.iter().map(|&i| &right_rows[i]).collect();
        match policy {
            ConflictPolicy::ExposeAll => {
                for right in matches {
                    rows.push(merge(left, right, &renamed));
                }
            }
            ConflictPolicy::PickFirst | ConflictPolicy::PickLast => {
                if let Some(order) = &params.order_by {
                    RowSorter::sort(&mut matches, order);
                }
                let picked = if policy == ConflictPolicy::PickFirst {
                    matches.first()
                } else {
                    matches.last()
                };
                if let Some(right) = picked {
                    rows.push(merge(left, right, &renamed));
                }
            }
            ConflictPolicy::Cluster => {
                let mut out = left.clone();
                let count = matches.len();
                out.insert(
                    MATCHES_COLUMN.to_string(),
                    Value::Array(matches.into_iter().map(|r| Value::Object(r.clone())).collect()),
                );
                out.insert(MATCH_COUNT_COLUMN.to_string(), json!(count));
                out.insert(MULTIPLE_COLUMN.to_string(), Value::Bool(count > 1));
                rows.push(out);
            }
            ConflictPolicy::Aggregate => rows.push(merge_aggregate(left, &matches, &renamed)),
        }
    }

    if params.kind.keeps_unmatched_right() {
        for (i, right) in right_rows.iter().enumerate() {
            if !matched_right[i] {
                rows.push(unmatched_right(right, left_columns, &renamed, policy));
            }
        }
    }

    Joined { rows, columns }
}

fn merge(left: &Row, right: &Row, renamed: &[(String, String)]) -> Row {
    let mut out = left.clone();
    for (source, target) in renamed {
        out.insert(target.clone(), right.get(source).cloned().unwrap_or(Value::Null));
    }
    out
}

/// Each right column holds the single shared value, or the distinct values
/// in match order when matches disagree
fn merge_aggregate(left: &Row, matches: &[&Row], renamed: &[(String, String)]) -> Row {
    let mut out = left.clone();
    for (source, target) in renamed {
        let mut distinct: Vec<Value> = Vec::new();
        for right in matches {
            let v = right.get(source).cloned().unwrap_or(Value::Null);
            if !distinct.contains(&v) {
                distinct.push(v);
            }
        }
        let merged = if distinct.len() == 1 {
            distinct.remove(0)
        } else {
            Value::Array(distinct)
        };
        out.insert(target.clone(), merged);
    }
    out.insert(MATCH_COUNT_COLUMN.to_string(), json!(matches.len()));
    out
}

fn unmatched_left(left: &Row, renamed: &[(String, String)], policy: ConflictPolicy) -> Row {
    let mut out = left.clone();
    match policy {
        ConflictPolicy::Cluster => {
            out.insert(MATCHES_COLUMN.to_string(), Value::Array(Vec::new()));
            out.insert(MATCH_COUNT_COLUMN.to_string(), json!(0));
            out.insert(MULTIPLE_COLUMN.to_string(), Value::Bool(false));
        }
        _ => {
            for (_, target) in renamed {
                out.insert(target.clone(), Value::Null);
            }
            if policy == ConflictPolicy::Aggregate {
                out.insert(MATCH_COUNT_COLUMN.to_string(), json!(0));
            }
        }
    }
    out
}

fn unmatched_right(
    right: &Row,
    left_columns: &[String],
    renamed: &[(String, String)],
    policy: ConflictPolicy,
) -> Row {
    let mut out = Row::new();
    for c in left_columns {
        out.insert(c.clone(), Value::Null);
    }
    match policy {
        ConflictPolicy::Cluster => {
            out.insert(
                MATCHES_COLUMN.to_string(),
                Value::Array(vec![Value::Object(right.clone())]),
            );
            out.insert(MATCH_COUNT_COLUMN.to_string(), json!(1));
            out.insert(MULTIPLE_COLUMN.to_string(), Value::Bool(false));
        }
        _ => {
            for (source, target) in renamed {
                out.insert(target.clone(), right.get(source).cloned().unwrap_or(Value::Null));
            }
            if policy == ConflictPolicy::Aggregate {
                out.insert(MATCH_COUNT_COLUMN.to_string(), json!(1));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::JoinKind;

    fn rows(v: Value) -> Vec<Row> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keys_match_case_insensitively_and_collisions_prefixed() {
        let left = rows(json!([{"id": 1, "email": "A@X.COM"}]));
        let right = rows(json!([{"id": 9, "email": "a@x.com"}]));
        let params = JoinParams::on("accounts", "email", "email").policy(ConflictPolicy::ExposeAll);
        let out = hash_join(
            &left,
            &cols(&["id", "email"]),
            &right,
            &cols(&["id", "email"]),
            &params,
            ConflictPolicy::ExposeAll,
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0]["accounts.id"], json!(9));
        assert_eq!(out.rows[0]["id"], json!(1));
    }

    #[test]
    fn test_pick_last_applies_order() {
        let left = rows(json!([{"k": "x"}]));
        let right = rows(json!([
            {"k": "x", "v": 3},
            {"k": "x", "v": 1},
            {"k": "x", "v": 2}
        ]));
        let params = JoinParams::on("r", "k", "k")
            .policy(ConflictPolicy::PickLast)
            .order_by("v", false);
        let out = hash_join(&left, &cols(&["k"]), &right, &cols(&["k", "v"]), &params, ConflictPolicy::PickLast);
        assert_eq!(out.rows[0]["v"], json!(3));

        let unordered = JoinParams::on("r", "k", "k").policy(ConflictPolicy::PickLast);
        let out = hash_join(&left, &cols(&["k"]), &right, &cols(&["k", "v"]), &unordered, ConflictPolicy::PickLast);
        assert_eq!(out.rows[0]["v"], json!(2));
    }

    #[test]
    fn test_aggregate_policy_merges_matches() {
        let left = rows(json!([{"k": "x"}]));
        let right = rows(json!([
            {"k": "x", "city": "Oslo", "tier": "gold"},
            {"k": "x", "city": "Bergen", "tier": "gold"}
        ]));
        let params = JoinParams::on("r", "k", "k").policy(ConflictPolicy::Aggregate);
        let out = hash_join(
            &left,
            &cols(&["k"]),
            &right,
            &cols(&["k", "city", "tier"]),
            &params,
            ConflictPolicy::Aggregate,
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0]["tier"], json!("gold"));
        assert_eq!(out.rows[0]["city"], json!(["Oslo", "Bergen"]));
        assert_eq!(out.rows[0][MATCH_COUNT_COLUMN], json!(2));
    }

    #[test]
    fn test_full_join_emits_both_unmatched_sides() {
        let left = rows(json!([{"k": "a", "l": 1}, {"k": "b", "l": 2}]));
        let right = rows(json!([{"rk": "b", "r": 20}, {"rk": "c", "r": 30}]));
        let params = JoinParams::on("r", "k", "rk")
            .kind(JoinKind::Full)
            .policy(ConflictPolicy::ExposeAll);
        let out = hash_join(
            &left,
            &cols(&["k", "l"]),
            &right,
            &cols(&["rk", "r"]),
            &params,
            ConflictPolicy::ExposeAll,
        );
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[0]["r"], Value::Null);
        assert_eq!(out.rows[1]["r"], json!(20));
        assert_eq!(out.rows[2]["k"], Value::Null);
        assert_eq!(out.rows[2]["r"], json!(30));
    }

    #[test]
    fn test_null_keys_never_match() {
        let left = rows(json!([{"k": null}]));
        let right = rows(json!([{"k": null}, {"k": ""}]));
        let params = JoinParams::on("r", "k", "k").policy(ConflictPolicy::ExposeAll);
        let out = hash_join(&left, &cols(&["k"]), &right, &cols(&["k"]), &params, ConflictPolicy::ExposeAll);
        assert!(out.rows.is_empty());
    }
}

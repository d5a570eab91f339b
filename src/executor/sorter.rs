//! Row ordering for pick-first / pick-last join policies
//!
//! Ordering rules:
//! - Missing < null < bool < number < string
//! - Numeric strings compare as numbers against numbers
//! - Sort is stable; equal keys keep source order

use std::cmp::Ordering;

use serde_json::Value;

use crate::operator::PickOrder;
use crate::predicate::{coerce_number, lookup, Row};

pub struct RowSorter;

impl RowSorter {
    /// Sorts row references by the pick order's field
    pub fn sort(rows: &mut [&Row], order: &PickOrder) {
        rows.sort_by(|a, b| {
            let ordering = Self::compare_values(lookup(a, &order.field), lookup(b, &order.field));
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let (a_val, b_val) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };

        if let (Some(x), Some(y)) = (coerce_number(Some(a_val)), coerce_number(Some(b_val))) {
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }

        let rank = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };
        match rank(a_val).cmp(&rank(b_val)) {
            Ordering::Equal => match (a_val, b_val) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_sort_numeric_strings_numerically() {
        let rows = [
            row(json!({"id": "a", "rank": "10"})),
            row(json!({"id": "b", "rank": 9})),
            row(json!({"id": "c", "rank": "2"})),
        ];
        let mut refs: Vec<&Row> = rows.iter().collect();
        RowSorter::sort(
            &mut refs,
            &PickOrder {
                field: "rank".into(),
                descending: false,
            },
        );
        let ids: Vec<_> = refs.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let rows = [
            row(json!({"id": "a", "n": 1})),
            row(json!({"id": "b", "n": 2})),
            row(json!({"id": "c", "n": 2})),
        ];
        let mut refs: Vec<&Row> = rows.iter().collect();
        RowSorter::sort(
            &mut refs,
            &PickOrder {
                field: "n".into(),
                descending: true,
            },
        );
        let ids: Vec<_> = refs.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_missing_sorts_first() {
        assert_eq!(
            RowSorter::compare_values(None, Some(&Value::Null)),
            Ordering::Less
        );
        assert_eq!(
            RowSorter::compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}

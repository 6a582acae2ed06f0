//! Collection queries and their ordering.

use crate::path::StorePath;
use crate::types::Record;
use serde_json::Value;
use std::cmp::Ordering;

/// A live query over one collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub collection: StorePath,
    /// Sort field, always descending.
    pub order_by: Option<String>,
}

impl Query {
    pub fn collection(collection: StorePath) -> Self {
        Self {
            collection,
            order_by: None,
        }
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Whether a document belongs in the result. An ordered query only
    /// returns documents carrying the sort field.
    pub fn includes(&self, record: &Record) -> bool {
        match &self.order_by {
            Some(field) => record.fields.contains_key(field),
            None => true,
        }
    }

    /// Filter and order documents given in id order.
    pub fn apply(&self, documents: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let mut matched: Vec<Record> = documents
            .into_iter()
            .filter(|record| self.includes(record))
            .collect();

        if let Some(field) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    _ => Ordering::Equal,
                };
                ord.then_with(|| a.id.cmp(&b.id)).reverse()
            });
        }

        matched
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used for sorting:
/// null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            // serde_json maps iterate in key order
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

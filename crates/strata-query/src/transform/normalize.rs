//! Logical group normalization.
//!
//! `{"$or": {"a": 1, "b": 2}}` and `{"$or": [{"a": 1}, {"b": 2}]}` mean the
//! same thing. Everything downstream only handles the array form, so object
//! shaped groups are split into one single-entry object per key.

use crate::ir::LogicalOp;
use crate::transform::QueryTransform;
use serde_json::{Map, Value};

/// Rewrites object-shaped logical groups into array-shaped ones.
pub struct NormalizeTransform;

impl QueryTransform for NormalizeTransform {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn transform(&self, criteria: Value) -> Value {
        normalize(&criteria)
    }
}

/// Normalize every logical group in `criteria`, at any depth.
///
/// Idempotent: normalizing already-normalized criteria returns it unchanged.
pub fn normalize(criteria: &Value) -> Value {
    match criteria {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let value = match (LogicalOp::from_key(key), value) {
                    (Some(_), Value::Object(group)) => Value::Array(
                        group
                            .iter()
                            .map(|(k, v)| {
                                let mut single = Map::with_capacity(1);
                                single.insert(k.clone(), v.clone());
                                normalize(&Value::Object(single))
                            })
                            .collect(),
                    ),
                    _ => normalize(value),
                };
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

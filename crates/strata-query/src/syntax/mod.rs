//! Decoding of the wire DSL.
//!
//! The Where DSL does not tag relation sub-queries: `{"AUTHOR": {"name": "x"}}`
//! and `{"age": {"$gt": 3}}` have the same JSON shape. [`split_level`] applies
//! the structural rule that tells them apart; [`expression`] and
//! [`aggregate`] decode the two halves of a request into [`crate::ir`] types.

pub mod aggregate;
pub mod expression;

pub use aggregate::decode_aggregate;
pub use expression::decode_expression;

use crate::ir::{LogicalOp, RelationDirection, RelationDirective};
use serde_json::{Map, Value};
use tracing::warn;

/// Identity-comparison pseudo-key
pub const ID_KEY: &str = "$id";
/// User-visible alias directive
pub const ALIAS_KEY: &str = "$alias";
/// Relation type/direction directive
pub const RELATION_KEY: &str = "$relation";

/// How a criteria key is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Logical(LogicalOp),
    Identity,
    Alias,
    Relation,
    Property,
    SubQuery,
}

/// Kind of a key compiled against the current alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKey {
    Logical(LogicalOp),
    Identity,
    Property,
    /// `$alias` / `$relation`, read by the caller
    Directive,
}

/// One criteria object partitioned by level.
#[derive(Debug, Default)]
pub struct LevelSplit<'a> {
    /// Keys compiled against the current alias
    pub current_level: Vec<(&'a str, &'a Value, LevelKey)>,
    /// Keys that traverse to a related record
    pub sub_queries: Vec<(&'a str, &'a Value)>,
}

/// Classify one key/value pair of a criteria object.
pub fn classify(key: &str, value: &Value) -> KeyKind {
    if let Some(op) = LogicalOp::from_key(key) {
        return KeyKind::Logical(op);
    }
    match key {
        ID_KEY => KeyKind::Identity,
        ALIAS_KEY => KeyKind::Alias,
        RELATION_KEY => KeyKind::Relation,
        _ if is_comparison_shape(value) => KeyKind::Property,
        _ => KeyKind::SubQuery,
    }
}

/// Partition a criteria object into current-level keys and sub-queries,
/// preserving key order within each half.
pub fn split_level(criteria: &Map<String, Value>) -> LevelSplit<'_> {
    let mut split = LevelSplit::default();
    for (key, value) in criteria {
        let kind = match classify(key, value) {
            KeyKind::SubQuery => {
                split.sub_queries.push((key.as_str(), value));
                continue;
            }
            KeyKind::Logical(op) => LevelKey::Logical(op),
            KeyKind::Identity => LevelKey::Identity,
            KeyKind::Property => LevelKey::Property,
            KeyKind::Alias | KeyKind::Relation => LevelKey::Directive,
        };
        split.current_level.push((key.as_str(), value, kind));
    }
    split
}

/// Whether `value` is a comparison rather than a nested filter.
///
/// Scalars and arrays are comparisons. An object is a comparison when it is
/// non-empty and all its keys are `$`-operators other than the keys that only
/// make sense inside a filter (logical groups and directives).
pub fn is_comparison_shape(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            !map.is_empty()
                && map.keys().all(|k| {
                    k.starts_with('$')
                        && LogicalOp::from_key(k).is_none()
                        && !matches!(k.as_str(), ID_KEY | ALIAS_KEY | RELATION_KEY)
                })
        }
        _ => true,
    }
}

/// Decode an optional `$relation` directive.
///
/// A bare string names the type; an object may carry `type` and
/// `direction` (`in`/`out`). Anything else falls back to an untyped,
/// undirected hop.
pub fn decode_relation(value: Option<&Value>) -> RelationDirective {
    match value {
        None => RelationDirective::default(),
        Some(Value::String(relation_type)) => RelationDirective {
            relation_type: Some(relation_type.clone()),
            direction: RelationDirection::Undirected,
        },
        Some(Value::Object(map)) => {
            let relation_type = map.get("type").and_then(Value::as_str).map(str::to_string);
            let direction = match map.get("direction") {
                None | Some(Value::Null) => RelationDirection::Undirected,
                Some(Value::String(d)) if d == "in" => RelationDirection::In,
                Some(Value::String(d)) if d == "out" => RelationDirection::Out,
                Some(other) => {
                    warn!(direction = %other, "Unknown relation direction, treating as undirected");
                    RelationDirection::Undirected
                }
            };
            RelationDirective {
                relation_type,
                direction,
            }
        }
        Some(other) => {
            warn!(relation = %other, "Ignoring malformed $relation directive");
            RelationDirective::default()
        }
    }
}

/// Decode an optional `$alias` directive.
pub fn decode_alias(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(alias)) => Some(alias.clone()),
        Some(other) => {
            warn!(alias = %other, "Ignoring non-string $alias directive");
            None
        }
        None => None,
    }
}

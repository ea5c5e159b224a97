//! Aggregate DSL decoding.
//!
//! Parses `{"field": {"fn": "count", "alias": "$employee"}, ...}` into an
//! [`AggregateSpec`], recursing through `collect` entries that carry their
//! own `aggregate`.

use crate::error::{ParseError, ParseResult};
use crate::ir::{
    Accumulation, Accumulator, Aggregate, AggregateSpec, Collect, OrderBy, SortDirection,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Wire shape of one aggregate entry before validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAggregate {
    #[serde(rename = "fn")]
    function: String,
    alias: String,
    field: Option<String>,
    uniq: Option<bool>,
    precision: Option<u32>,
    limit: Option<u64>,
    skip: Option<u64>,
    order_by: Option<Value>,
    aggregate: Option<Value>,
}

/// Decode an Aggregate DSL object.
pub fn decode_aggregate(value: &Value) -> ParseResult<AggregateSpec> {
    let map = value.as_object().ok_or_else(|| ParseError::InvalidAggregate {
        key: String::new(),
        message: "aggregate must be an object".to_string(),
        value: value.clone(),
    })?;
    decode_fields(map)
}

fn decode_fields(map: &Map<String, Value>) -> ParseResult<AggregateSpec> {
    let fields = map
        .iter()
        .map(|(name, entry)| Ok((name.clone(), decode_entry(name, entry)?)))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(AggregateSpec { fields })
}

fn decode_entry(name: &str, entry: &Value) -> ParseResult<Aggregate> {
    let invalid = |message: String| ParseError::InvalidAggregate {
        key: name.to_string(),
        message,
        value: entry.clone(),
    };

    let raw: RawAggregate =
        serde_json::from_value(entry.clone()).map_err(|e| invalid(e.to_string()))?;

    let function = match raw.function.as_str() {
        "collect" => {
            let order_by = raw
                .order_by
                .as_ref()
                .map(|o| decode_order_by(name, o))
                .transpose()?;
            let aggregate = match &raw.aggregate {
                Some(Value::Object(_)) if raw.field.is_some() => {
                    warn!(
                        field = name,
                        "Collect of a single field cannot nest an aggregate; ignoring"
                    );
                    None
                }
                Some(Value::Object(nested)) => Some(decode_fields(nested)?),
                Some(other) => {
                    return Err(invalid(format!(
                        "nested aggregate must be an object, got {other}"
                    )));
                }
                None => None,
            };
            return Ok(Aggregate::Collect(Collect {
                alias: raw.alias,
                field: raw.field,
                uniq: raw.uniq.unwrap_or(true),
                limit: raw.limit,
                skip: raw.skip,
                order_by,
                aggregate,
            }));
        }
        "count" => Accumulator::Count,
        "sum" => Accumulator::Sum,
        "avg" => Accumulator::Avg,
        "min" => Accumulator::Min,
        "max" => Accumulator::Max,
        other => return Err(invalid(format!("unknown aggregate function `{other}`"))),
    };

    if function != Accumulator::Count && raw.field.is_none() {
        return Err(invalid(format!("`{}` requires a field", function.function())));
    }
    if raw.aggregate.is_some() {
        warn!(field = name, "Nested aggregate is only supported on collect; ignoring");
    }

    Ok(Aggregate::Accumulate(Accumulation {
        function,
        alias: raw.alias,
        field: raw.field,
        uniq: raw.uniq.unwrap_or(false),
        precision: raw.precision,
    }))
}

/// Decode `orderBy`: `"asc"`, `"desc"` or `{"field": "asc"|"desc", ...}`.
pub fn decode_order_by(key: &str, value: &Value) -> ParseResult<OrderBy> {
    let invalid = || ParseError::InvalidOperand {
        key: key.to_string(),
        operator: "orderBy".to_string(),
        value: value.clone(),
    };

    match value {
        Value::String(direction) => SortDirection::from_name(direction)
            .map(OrderBy::Direction)
            .ok_or_else(invalid),
        Value::Object(fields) if !fields.is_empty() => fields
            .iter()
            .map(|(field, direction)| {
                direction
                    .as_str()
                    .and_then(SortDirection::from_name)
                    .map(|d| (field.clone(), d))
                    .ok_or_else(invalid)
            })
            .collect::<ParseResult<Vec<_>>>()
            .map(OrderBy::Fields),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_flat_aggregate() {
        let spec = decode_aggregate(&json!({
            "employee_count": {"fn": "count", "alias": "$employee"},
            "departments": {"fn": "collect", "uniq": true, "field": "name", "alias": "$department"},
            "avgSalary": {"fn": "avg", "field": "salary", "alias": "$employee", "precision": 2}
        }))
        .unwrap();

        let names: Vec<_> = spec.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["employee_count", "departments", "avgSalary"]);
        assert!(!spec.is_nested());

        let Aggregate::Accumulate(avg) = &spec.fields[2].1 else {
            panic!("expected accumulation");
        };
        assert_eq!(avg.function, Accumulator::Avg);
        assert_eq!(avg.precision, Some(2));
    }

    #[test]
    fn test_decode_nested_collect() {
        let spec = decode_aggregate(&json!({
            "departments": {
                "fn": "collect",
                "alias": "$department",
                "orderBy": {"name": "desc"},
                "aggregate": {
                    "projects": {"fn": "collect", "alias": "$project", "limit": 5}
                }
            }
        }))
        .unwrap();

        assert!(spec.is_nested());
        let Aggregate::Collect(collect) = &spec.fields[0].1 else {
            panic!("expected collect");
        };
        assert!(collect.uniq);
        assert_eq!(
            collect.order_by,
            Some(OrderBy::Fields(vec![("name".to_string(), SortDirection::Desc)]))
        );
        let nested = collect.aggregate.as_ref().unwrap();
        assert_eq!(nested.fields[0].0, "projects");
    }

    #[test]
    fn test_unknown_function_rejected() {
        let err = decode_aggregate(&json!({"x": {"fn": "median", "alias": "$a", "field": "n"}}))
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidAggregate { .. }));
        assert_eq!(err.key(), "x");
    }

    #[test]
    fn test_sum_requires_field() {
        let err = decode_aggregate(&json!({"total": {"fn": "sum", "alias": "$task"}})).unwrap_err();
        assert!(err.to_string().contains("requires a field"));
    }

    #[test]
    fn test_missing_alias_rejected() {
        assert!(decode_aggregate(&json!({"c": {"fn": "count"}})).is_err());
    }

    #[test]
    fn test_order_by_shapes() {
        assert_eq!(
            decode_order_by("orderBy", &json!("desc")).unwrap(),
            OrderBy::Direction(SortDirection::Desc)
        );
        assert!(decode_order_by("orderBy", &json!("sideways")).is_err());
        assert!(decode_order_by("orderBy", &json!({})).is_err());
    }
}

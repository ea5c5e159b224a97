//! Property expression decoding.
//!
//! Turns the value side of a property key into an [`Expression`]. This is the
//! only place operator strings are looked at; unknown operators and
//! malformed operands are rejected here with the offending key and value.

use crate::error::{ParseError, ParseResult};
use crate::ir::{
    Condition, DatetimeComponent, DatetimeParts, Expression, Operand, PropertyType, RangeOp,
    StringOp, Threshold, VectorSearch,
};
use serde_json::{Map, Value};

const VECTOR_KEY: &str = "$vector";
const SIMILARITY_NAMESPACE: &str = "gds.similarity.";

/// Decode the expression compared against property `key`.
pub fn decode_expression(key: &str, value: &Value) -> ParseResult<Expression> {
    match value {
        Value::Null => Ok(Expression::Equals(Operand::Null)),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(Expression::Equals(Operand::Literal(value.clone())))
        }
        Value::Array(_) => Err(ParseError::ArrayForScalar {
            key: key.to_string(),
            value: value.clone(),
        }),
        Value::Object(map) if has_datetime_component(map) => Ok(Expression::Equals(
            Operand::Datetime(decode_datetime(key, map, value)?),
        )),
        Value::Object(map) => map
            .iter()
            .map(|(op, operand)| decode_condition(key, op, operand))
            .collect::<ParseResult<Vec<_>>>()
            .map(Expression::Conditions),
    }
}

fn has_datetime_component(map: &Map<String, Value>) -> bool {
    map.keys().any(|k| DatetimeComponent::from_key(k).is_some())
}

fn decode_condition(key: &str, op: &str, operand: &Value) -> ParseResult<Condition> {
    if let Some(range) = RangeOp::from_key(op) {
        return Ok(Condition::Compare(range, decode_operand(key, op, operand)?));
    }
    if let Some(string_op) = StringOp::from_key(op) {
        return match operand {
            Value::String(s) => Ok(Condition::Text(string_op, s.clone())),
            _ => Err(ParseError::operand(key, op, operand)),
        };
    }

    match op {
        "$in" => Ok(Condition::In(decode_list(key, op, operand)?)),
        "$nin" => Ok(Condition::NotIn(decode_list(key, op, operand)?)),
        "$exists" => match operand {
            Value::Bool(b) => Ok(Condition::Exists(*b)),
            _ => Err(ParseError::InvalidExists {
                key: key.to_string(),
                value: operand.clone(),
            }),
        },
        "$type" => operand
            .as_str()
            .and_then(PropertyType::from_name)
            .map(Condition::Type)
            .ok_or_else(|| ParseError::InvalidType {
                key: key.to_string(),
                value: operand.clone(),
            }),
        VECTOR_KEY => Ok(Condition::Vector(decode_vector(key, operand)?)),
        _ => Err(ParseError::UnknownOperator {
            key: key.to_string(),
            operator: op.to_string(),
            value: operand.clone(),
        }),
    }
}

/// Right-hand side of a range operator: scalar, null or datetime object.
fn decode_operand(key: &str, op: &str, operand: &Value) -> ParseResult<Operand> {
    match operand {
        Value::Null => Ok(Operand::Null),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(Operand::Literal(operand.clone()))
        }
        Value::Object(map) if has_datetime_component(map) => {
            Ok(Operand::Datetime(decode_datetime(key, map, operand)?))
        }
        _ => Err(ParseError::operand(key, op, operand)),
    }
}

fn decode_list(key: &str, op: &str, operand: &Value) -> ParseResult<Vec<Value>> {
    match operand {
        Value::Array(items) if items.iter().all(is_scalar) => Ok(items.clone()),
        _ => Err(ParseError::operand(key, op, operand)),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn decode_datetime(key: &str, map: &Map<String, Value>, raw: &Value) -> ParseResult<DatetimeParts> {
    let mut components = Vec::with_capacity(map.len());
    for (name, amount) in map {
        let component =
            DatetimeComponent::from_key(name).ok_or_else(|| ParseError::UnknownDatetimeComponent {
                key: key.to_string(),
                component: name.clone(),
                value: raw.clone(),
            })?;
        if !(amount.is_i64() || amount.is_u64()) {
            return Err(ParseError::operand(key, name, amount));
        }
        components.push((component, amount.clone()));
    }

    if !components.iter().any(|(c, _)| *c == DatetimeComponent::Year) {
        return Err(ParseError::MissingYear {
            key: key.to_string(),
            value: raw.clone(),
        });
    }

    components.sort_by_key(|(c, _)| *c);
    Ok(DatetimeParts { components })
}

fn decode_vector(key: &str, operand: &Value) -> ParseResult<VectorSearch> {
    let invalid = || ParseError::operand(key, VECTOR_KEY, operand);
    let spec = operand.as_object().ok_or_else(invalid)?;

    let function = spec.get("fn").and_then(Value::as_str).ok_or_else(invalid)?;
    let function = if function.starts_with(SIMILARITY_NAMESPACE) {
        function.to_string()
    } else {
        format!("{SIMILARITY_NAMESPACE}{function}")
    };

    let query = match spec.get("query") {
        Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_number) => {
            items.clone()
        }
        _ => return Err(invalid()),
    };

    let threshold = match spec.get("threshold") {
        Some(n @ Value::Number(_)) => Threshold::AtLeast(n.clone()),
        Some(Value::Object(bounds)) if !bounds.is_empty() => {
            let mut range = Vec::with_capacity(bounds.len());
            for (op, bound) in bounds {
                let range_op = RangeOp::from_key(op).ok_or_else(|| ParseError::UnknownOperator {
                    key: key.to_string(),
                    operator: op.clone(),
                    value: bound.clone(),
                })?;
                if !bound.is_number() {
                    return Err(ParseError::operand(key, op, bound));
                }
                range.push((range_op, bound.clone()));
            }
            Threshold::Range(range)
        }
        _ => return Err(invalid()),
    };

    Ok(VectorSearch {
        function,
        query,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_scalar_is_equality() {
        assert_eq!(
            decode_expression("name", &json!("Jack")).unwrap(),
            Expression::Equals(Operand::Literal(json!("Jack")))
        );
        assert_eq!(
            decode_expression("name", &json!(null)).unwrap(),
            Expression::Equals(Operand::Null)
        );
    }

    #[test]
    fn test_range_conditions_keep_order() {
        let expr = decode_expression("age", &json!({"$gte": 21, "$lte": 100})).unwrap();
        assert_eq!(
            expr,
            Expression::Conditions(vec![
                Condition::Compare(RangeOp::Gte, Operand::Literal(json!(21))),
                Condition::Compare(RangeOp::Lte, Operand::Literal(json!(100))),
            ])
        );
    }

    #[test]
    fn test_datetime_components_sorted() {
        let expr = decode_expression("born", &json!({"$month": 3, "$year": 1990})).unwrap();
        let Expression::Equals(Operand::Datetime(parts)) = expr else {
            panic!("expected datetime equality");
        };
        assert_eq!(parts.components[0].0, DatetimeComponent::Year);
        assert_eq!(parts.components[1].0, DatetimeComponent::Month);
    }

    #[test]
    fn test_datetime_inside_range() {
        let expr = decode_expression("born", &json!({"$gt": {"$year": 2000}})).unwrap();
        assert!(matches!(
            expr,
            Expression::Conditions(ref c) if matches!(c[0], Condition::Compare(RangeOp::Gt, Operand::Datetime(_)))
        ));
    }

    #[test]
    fn test_vector_prefixes_function() {
        let expr = decode_expression(
            "embedding",
            &json!({"$vector": {"fn": "cosine", "query": [0.1, 0.2], "threshold": 0.9}}),
        )
        .unwrap();
        let Expression::Conditions(conditions) = expr else {
            panic!("expected conditions");
        };
        let Condition::Vector(vector) = &conditions[0] else {
            panic!("expected vector condition");
        };
        assert_eq!(vector.function, "gds.similarity.cosine");
        assert_eq!(vector.threshold, Threshold::AtLeast(json!(0.9)));
    }

    // =========================================================================
    // Rejections
    // =========================================================================

    #[test]
    fn test_unknown_operator() {
        let err = decode_expression("age", &json!({"$between": [1, 2]})).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperator { ref operator, .. } if operator == "$between"));
        assert_eq!(err.key(), "age");
    }

    #[test]
    fn test_array_for_scalar() {
        let err = decode_expression("tags", &json!(["a", "b"])).unwrap_err();
        assert!(matches!(err, ParseError::ArrayForScalar { .. }));
        assert_eq!(err.value(), &json!(["a", "b"]));
    }

    #[test]
    fn test_bad_datetime_component() {
        let err = decode_expression("born", &json!({"$year": 2000, "$week": 3})).unwrap_err();
        assert!(matches!(err, ParseError::UnknownDatetimeComponent { ref component, .. } if component == "$week"));
    }

    #[test]
    fn test_datetime_requires_year() {
        let err = decode_expression("born", &json!({"$month": 3})).unwrap_err();
        assert!(matches!(err, ParseError::MissingYear { .. }));
    }

    #[test_case(json!({"$exists": "yes"}) ; "non-boolean exists")]
    #[test_case(json!({"$exists": 1}) ; "numeric exists")]
    fn test_invalid_exists(value: Value) {
        assert!(matches!(
            decode_expression("name", &value),
            Err(ParseError::InvalidExists { .. })
        ));
    }

    #[test_case(json!({"$type": "object"}) ; "unknown type name")]
    #[test_case(json!({"$type": true}) ; "non-string type")]
    fn test_invalid_type(value: Value) {
        assert!(matches!(
            decode_expression("name", &value),
            Err(ParseError::InvalidType { .. })
        ));
    }

    #[test_case(json!({"$in": "active"}) ; "in with string")]
    #[test_case(json!({"$nin": [[1]]}) ; "nin with nested list")]
    #[test_case(json!({"$contains": 3}) ; "contains with number")]
    #[test_case(json!({"$gt": [1]}) ; "range with array")]
    #[test_case(json!({"$vector": {"fn": "cosine", "query": [], "threshold": 1}}) ; "empty vector query")]
    #[test_case(json!({"$vector": {"fn": "cosine", "query": [1.0]}}) ; "missing threshold")]
    fn test_invalid_operand(value: Value) {
        assert!(matches!(
            decode_expression("x", &value),
            Err(ParseError::InvalidOperand { .. })
        ));
    }
}

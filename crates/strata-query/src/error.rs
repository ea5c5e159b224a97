//! Error types for criteria parsing.
//!
//! Every failure is a criteria parsing error: the variants name the reason,
//! and all of them carry the offending key and the raw JSON value so the
//! service layer can echo them back to the caller.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while decoding or compiling a search request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Comparison operator not in the closed operator set.
    #[error("Unknown operator `{operator}` for `{key}`: {value}")]
    UnknownOperator {
        key: String,
        operator: String,
        value: Value,
    },

    /// Datetime object with a key that is not a datetime component.
    #[error("Unknown datetime component `{component}` for `{key}`: {value}")]
    UnknownDatetimeComponent {
        key: String,
        component: String,
        value: Value,
    },

    /// Datetime component object without `$year`.
    #[error("Datetime components for `{key}` require `$year`: {value}")]
    MissingYear { key: String, value: Value },

    /// Array given where a scalar equality was expected.
    #[error("Expected a scalar for `{key}`, got an array: {value}")]
    ArrayForScalar { key: String, value: Value },

    /// `$exists` with a non-boolean value.
    #[error("`$exists` for `{key}` must be a boolean, got {value}")]
    InvalidExists { key: String, value: Value },

    /// `$type` outside the enumerated type names.
    #[error("`$type` for `{key}` must be one of string, number, boolean, null, datetime, vector; got {value}")]
    InvalidType { key: String, value: Value },

    /// Operand shape the operator cannot take (e.g. `$in` with a string).
    #[error("Invalid operand for `{operator}` on `{key}`: {value}")]
    InvalidOperand {
        key: String,
        operator: String,
        value: Value,
    },

    /// Aggregate entry that does not decode.
    #[error("Invalid aggregate `{key}`: {message}")]
    InvalidAggregate {
        key: String,
        message: String,
        value: Value,
    },

    /// Aggregate referring to an alias no relation registered.
    #[error("Aggregate `{key}` references unknown alias {value}")]
    UnknownAlias { key: String, value: Value },

    /// Search request body that does not decode.
    #[error("Invalid search request: {message}")]
    InvalidRequest { message: String, value: Value },
}

impl ParseError {
    /// The offending key (property, operator owner, or aggregate field).
    pub fn key(&self) -> &str {
        match self {
            Self::UnknownOperator { key, .. }
            | Self::UnknownDatetimeComponent { key, .. }
            | Self::MissingYear { key, .. }
            | Self::ArrayForScalar { key, .. }
            | Self::InvalidExists { key, .. }
            | Self::InvalidType { key, .. }
            | Self::InvalidOperand { key, .. }
            | Self::InvalidAggregate { key, .. }
            | Self::UnknownAlias { key, .. } => key,
            Self::InvalidRequest { .. } => "",
        }
    }

    /// The raw value that failed to parse.
    pub fn value(&self) -> &Value {
        match self {
            Self::UnknownOperator { value, .. }
            | Self::UnknownDatetimeComponent { value, .. }
            | Self::MissingYear { value, .. }
            | Self::ArrayForScalar { value, .. }
            | Self::InvalidExists { value, .. }
            | Self::InvalidType { value, .. }
            | Self::InvalidOperand { value, .. }
            | Self::InvalidAggregate { value, .. }
            | Self::UnknownAlias { value, .. }
            | Self::InvalidRequest { value, .. } => value,
        }
    }

    pub(crate) fn operand(key: &str, operator: &str, value: &Value) -> Self {
        Self::InvalidOperand {
            key: key.to_string(),
            operator: operator.to_string(),
            value: value.clone(),
        }
    }
}

/// Result type for criteria parsing
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_exposes_key_and_value() {
        let err = ParseError::InvalidExists {
            key: "name".to_string(),
            value: json!("yes"),
        };

        assert_eq!(err.key(), "name");
        assert_eq!(err.value(), &json!("yes"));
        assert_eq!(
            err.to_string(),
            "`$exists` for `name` must be a boolean, got \"yes\""
        );
    }

    #[test]
    fn test_unknown_operator_message() {
        let err = ParseError::UnknownOperator {
            key: "age".to_string(),
            operator: "$between".to_string(),
            value: json!([1, 2]),
        };

        assert_eq!(err.to_string(), "Unknown operator `$between` for `age`: [1,2]");
    }
}

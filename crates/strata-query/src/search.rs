//! Search requests.
//!
//! [`SearchQuery`] is the request body; [`compile_search`] runs the whole
//! pipeline over it: normalize, compile and assemble the where half, compile
//! the aggregate half against the registered aliases, render the statement.

use crate::error::{ParseError, ParseResult};
use crate::options::CompileOptions;
use crate::render::{
    assemble, compile_aggregate, CompiledAggregate, CompiledWhere, CypherRenderer, QueryRenderer,
};
use crate::syntax::aggregate::decode_order_by;
use crate::syntax::decode_aggregate;
use crate::transform::{NormalizeTransform, QueryTransform};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, trace};

/// Search request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchQuery {
    /// Where DSL
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Value>,

    /// Labels the root record may carry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// `"asc"`, `"desc"` or `{field: direction}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Aggregate DSL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Value>,
}

impl SearchQuery {
    /// Decode a request from parsed JSON.
    pub fn from_json(value: &Value) -> ParseResult<Self> {
        Self::deserialize(value).map_err(|e| ParseError::InvalidRequest {
            message: e.to_string(),
            value: value.clone(),
        })
    }
}

impl FromStr for SearchQuery {
    type Err = ParseError;

    fn from_str(text: &str) -> ParseResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| ParseError::InvalidRequest {
            message: e.to_string(),
            value: Value::String(text.to_string()),
        })?;
        Self::from_json(&value)
    }
}

/// Everything compiled from one search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSearch {
    #[serde(rename = "where")]
    pub compiled: CompiledWhere,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<CompiledAggregate>,
    /// Full statement
    pub statement: String,
}

/// Rewrites applied to the `where` criteria before compilation, in order.
fn criteria_transforms() -> Vec<Box<dyn QueryTransform>> {
    vec![Box::new(NormalizeTransform)]
}

fn prepare_criteria(criteria: Option<&Value>) -> Value {
    let Some(criteria) = criteria else {
        return Value::Null;
    };
    criteria_transforms()
        .iter()
        .fold(criteria.clone(), |criteria, transform| {
            trace!(transform = transform.name(), "Applying criteria transform");
            transform.transform(criteria)
        })
}

/// Compile a search request end to end.
pub fn compile_search(
    query: &SearchQuery,
    options: &CompileOptions,
) -> ParseResult<CompiledSearch> {
    let criteria = prepare_criteria(query.criteria.as_ref());
    let order_by = query
        .order_by
        .as_ref()
        .map(|o| decode_order_by("orderBy", o))
        .transpose()?;

    let compiled = assemble(
        &criteria,
        &query.labels,
        order_by.as_ref(),
        query.skip,
        query.limit,
        options,
    )?;

    let aggregate = match &query.aggregate {
        Some(spec) => {
            let spec = decode_aggregate(spec)?;
            Some(compile_aggregate(&spec, &compiled.aliases_map, options)?)
        }
        None => None,
    };

    let renderer = CypherRenderer::new(options.clone());
    let statement = renderer.render(&compiled, aggregate.as_ref());
    debug!(
        renderer = renderer.name(),
        related = compiled.has_related_conditions,
        aggregate = aggregate.is_some(),
        "Compiled search"
    );

    Ok(CompiledSearch {
        compiled,
        aggregate,
        statement,
    })
}

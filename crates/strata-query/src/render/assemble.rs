//! Query assembly.
//!
//! Runs the where compiler over a fresh [`ParseContext`] and folds the
//! per-alias fragments into the clauses the statement template interpolates.

use crate::error::ParseResult;
use crate::ir::{OrderBy, SortDirection};
use crate::options::CompileOptions;
use crate::render::context::{AliasId, ParseContext};
use crate::render::level::compile_where;
use crate::render::literal::{list, member, quoted};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Compiled `where` half of a search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledWhere {
    /// `WHERE ...` over the root and every matched alias
    pub query_clauses: String,
    /// One `OPTIONAL MATCH` per relation alias, in alias order
    pub sorted_query_parts: Vec<String>,
    /// User alias name -> generated alias
    pub aliases_map: BTreeMap<String, String>,
    /// Generated aliases, root first
    pub node_aliases: Vec<String>,
    /// Root match pattern
    pub root_pattern: String,
    pub order_clause: String,
    /// `SKIP s LIMIT l`, empty when deferred past relation matches
    pub pagination: String,
    pub has_related_conditions: bool,
    /// Normalized criteria the clauses were compiled from
    pub parsed_where: Value,
    pub skip: u64,
    pub limit: u64,
}

impl CompiledWhere {
    /// `SKIP s LIMIT l` regardless of deferral.
    pub fn page(&self) -> String {
        format!("SKIP {} LIMIT {}", self.skip, self.limit)
    }
}

/// Compile `parsed_where` and assemble the filter clauses.
pub fn assemble(
    parsed_where: &Value,
    labels: &[String],
    order_by: Option<&OrderBy>,
    skip: Option<u64>,
    limit: Option<u64>,
    options: &CompileOptions,
) -> ParseResult<CompiledWhere> {
    let mut ctx = ParseContext::new(options);
    compile_where(parsed_where, &mut ctx)?;

    let root = options.root_alias.as_str();
    let has_related_conditions = ctx.alias_count() > 1;

    let mut clauses = vec![format!("({root} IS NOT NULL)")];
    if labels.len() > 1 {
        let names: Vec<Value> = labels.iter().cloned().map(Value::String).collect();
        clauses.push(format!(
            "any(label IN labels({root}) WHERE label IN {})",
            list(&names)
        ));
    }
    let root_terms = match ctx.take_deferred(AliasId::ROOT) {
        Some(deferred) => deferred,
        None => ctx.result(AliasId::ROOT).map(<[String]>::to_vec).unwrap_or_default(),
    };
    clauses.extend(root_terms);
    debug_assert!(!ctx.has_pending(), "deferred predicates left unconsumed");

    let sorted_query_parts = ctx
        .matched_aliases()
        .skip(1)
        .filter_map(|id| {
            let pattern = ctx.pattern(id)?;
            Some(match ctx.result(id) {
                Some(terms) if !terms.is_empty() => {
                    format!("OPTIONAL MATCH {pattern} WHERE {}", terms.join(" AND "))
                }
                _ => format!("OPTIONAL MATCH {pattern}"),
            })
        })
        .collect();

    let skip = skip.unwrap_or(0);
    let limit = limit.unwrap_or(options.default_limit);
    let pagination = if has_related_conditions {
        String::new()
    } else {
        format!("SKIP {skip} LIMIT {limit}")
    };

    let compiled = CompiledWhere {
        query_clauses: format!("WHERE {}", clauses.join(" AND ")),
        sorted_query_parts,
        aliases_map: ctx.aliases_map().clone(),
        node_aliases: ctx.node_aliases(),
        root_pattern: root_pattern(labels, options),
        order_clause: order_clause(order_by, options),
        pagination,
        has_related_conditions,
        parsed_where: parsed_where.clone(),
        skip,
        limit,
    };
    debug!(
        aliases = compiled.node_aliases.len(),
        related = has_related_conditions,
        "Assembled where clauses"
    );
    Ok(compiled)
}

/// `(record:__RECORD__)`, plus the label when exactly one is requested.
fn root_pattern(labels: &[String], options: &CompileOptions) -> String {
    match labels {
        [label] => format!(
            "({}:{}:{})",
            options.root_alias,
            options.record_label,
            quoted(label)
        ),
        _ => format!("({}:{})", options.root_alias, options.record_label),
    }
}

/// `ORDER BY ...`; identity descending when unspecified.
pub fn order_clause(order_by: Option<&OrderBy>, options: &CompileOptions) -> String {
    let root = options.root_alias.as_str();
    let keys = match order_by {
        None => format!("{} {}", member(root, &options.id_key), SortDirection::Desc.keyword()),
        Some(OrderBy::Direction(direction)) => {
            format!("{} {}", member(root, &options.id_key), direction.keyword())
        }
        Some(OrderBy::Fields(fields)) => fields
            .iter()
            .map(|(field, direction)| format!("{} {}", member(root, field), direction.keyword()))
            .collect::<Vec<_>>()
            .join(", "),
    };
    format!("ORDER BY {keys}")
}

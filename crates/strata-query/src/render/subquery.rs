//! Relation sub-query expansion.
//!
//! `{"EMPLOYEE": {"role": "CTO"}}` allocates a fresh alias for the related
//! record, records an optional match pattern for it, and compiles the nested
//! filter against the new alias. The parent receives one term that checks
//! the traversal matched.
//!
//! Inside `$not` / `$nor` a sub-query is not matched at all: it renders as an
//! `EXISTS { MATCH ... }` predicate, so the negation covers every related
//! record however deep the nested filter goes.

use crate::error::{ParseError, ParseResult};
use crate::ir::{RelationDirection, RelationDirective};
use crate::render::context::{AliasId, ParseContext};
use crate::render::level::compile_object;
use crate::render::literal::quoted;
use crate::syntax::{decode_alias, decode_relation, ALIAS_KEY, RELATION_KEY};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Expand the sub-query `label: nested` below `parent`.
///
/// Returns the term the parent level conjoins or groups.
pub fn expand(
    label: &str,
    nested: &Value,
    parent: AliasId,
    ctx: &mut ParseContext<'_>,
) -> ParseResult<String> {
    let map = nested
        .as_object()
        .ok_or_else(|| ParseError::operand(label, label, nested))?;
    if ctx.in_negation() {
        return expand_existential(label, map, parent, ctx);
    }

    ctx.level += 1;
    let id = ctx.allocate();
    if let Some(user_alias) = decode_alias(map.get(ALIAS_KEY)) {
        ctx.register_alias(user_alias, id);
    }

    let directive = decode_relation(map.get(RELATION_KEY));
    let pattern = relation_pattern(ctx.alias_name(parent), &directive, ctx.alias_name(id), label);
    ctx.set_pattern(id, pattern);

    let allocated = ctx.alias_count();
    let terms = compile_object(map, id, ctx)?;
    let child = ctx.alias_name(id).to_string();

    // Terms that mention deeper aliases wait for their optional matches.
    if ctx.alias_count() > allocated {
        debug!(alias = %child, terms = terms.len(), "Deferring predicates past nested matches");
        ctx.defer(id, terms);
    } else if !terms.is_empty() {
        ctx.set_result(id, terms);
    }
    ctx.level -= 1;

    let term = match ctx.take_deferred(id) {
        Some(deferred) if !deferred.is_empty() => {
            format!("({child} IS NOT NULL AND {})", deferred.join(" AND "))
        }
        _ => format!("{child} IS NOT NULL"),
    };
    Ok(term)
}

/// `EXISTS { MATCH (parent)--(child:`Label`) WHERE ... }`
fn expand_existential(
    label: &str,
    map: &Map<String, Value>,
    parent: AliasId,
    ctx: &mut ParseContext<'_>,
) -> ParseResult<String> {
    ctx.level += 1;
    let id = ctx.allocate_scoped();
    if let Some(user_alias) = decode_alias(map.get(ALIAS_KEY)) {
        warn!(alias = %user_alias, "Alias inside a negated group is never bound; ignoring");
    }

    let directive = decode_relation(map.get(RELATION_KEY));
    let pattern =
        relation_pattern(ctx.alias_name(parent), &directive, ctx.alias_name(id), label);
    let terms = compile_object(map, id, ctx)?;
    ctx.level -= 1;

    Ok(if terms.is_empty() {
        format!("EXISTS {{ MATCH {pattern} }}")
    } else {
        format!("EXISTS {{ MATCH {pattern} WHERE {} }}", terms.join(" AND "))
    })
}

/// `(parent)-[:TYPE]->(child:`Label`)`
pub fn relation_pattern(
    parent: &str,
    directive: &RelationDirective,
    child: &str,
    label: &str,
) -> String {
    let relation = directive
        .relation_type
        .as_deref()
        .map(|t| format!("[:{}]", quoted(t)))
        .unwrap_or_default();
    let (left, right) = match directive.direction {
        RelationDirection::Out => ("-", "->"),
        RelationDirection::In => ("<-", "-"),
        RelationDirection::Undirected => ("-", "-"),
    };
    format!("({parent}){left}{relation}{right}({child}:{})", quoted(label))
}

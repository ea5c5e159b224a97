//! Current-level compilation.
//!
//! Compiles one criteria object against one alias: properties and `$id`
//! through the comparison compiler, logical groups member by member, and
//! sub-queries through the expander. Each object yields a list of terms the
//! caller conjoins. Members of `$not` / `$nor` groups are compiled with the
//! context marked as negated, which turns their sub-queries existential.

use crate::error::{ParseError, ParseResult};
use crate::ir::LogicalOp;
use crate::render::comparison::{compile_comparison, compile_identity};
use crate::render::context::{AliasId, ParseContext};
use crate::render::subquery::expand;
use crate::syntax::{decode_alias, split_level, LevelKey, ALIAS_KEY};
use serde_json::{Map, Value};
use tracing::debug;

/// Compile normalized `where` criteria against the root alias.
///
/// The root's terms are stored on the context: deferred when relation
/// aliases were allocated, attached to the root otherwise.
pub fn compile_where(criteria: &Value, ctx: &mut ParseContext<'_>) -> ParseResult<()> {
    let map = match criteria {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        other => return Err(ParseError::operand("where", "where", other)),
    };

    if let Some(user_alias) = decode_alias(map.get(ALIAS_KEY)) {
        ctx.register_alias(user_alias, AliasId::ROOT);
    }

    let terms = compile_object(map, AliasId::ROOT, ctx)?;
    if ctx.alias_count() > 1 {
        ctx.defer(AliasId::ROOT, terms);
    } else if !terms.is_empty() {
        ctx.set_result(AliasId::ROOT, terms);
    }
    Ok(())
}

/// Compile every key of `map` against alias `id`.
pub fn compile_object(
    map: &Map<String, Value>,
    id: AliasId,
    ctx: &mut ParseContext<'_>,
) -> ParseResult<Vec<String>> {
    let split = split_level(map);
    let alias = ctx.alias_name(id).to_string();
    let options = ctx.options();
    let mut terms = Vec::new();

    for (key, value, kind) in split.current_level {
        match kind {
            LevelKey::Logical(op) => terms.extend(compile_logical(op, value, id, ctx)?),
            LevelKey::Identity => terms.extend(compile_identity(&alias, value, options)?),
            LevelKey::Property => terms.extend(compile_comparison(&alias, key, value, options)?),
            LevelKey::Directive => {}
        }
    }

    if !split.sub_queries.is_empty() {
        debug!(
            alias = %alias,
            count = split.sub_queries.len(),
            "Expanding relation sub-queries"
        );
    }
    for (label, nested) in split.sub_queries {
        terms.push(expand(label, nested, id, ctx)?);
    }

    Ok(terms)
}

/// Compile a logical group. Empty groups produce no term.
pub fn compile_logical(
    op: LogicalOp,
    value: &Value,
    id: AliasId,
    ctx: &mut ParseContext<'_>,
) -> ParseResult<Option<String>> {
    if op.negates() {
        ctx.negated += 1;
    }
    let members = compile_members(op, value, id, ctx);
    if op.negates() {
        ctx.negated -= 1;
    }
    let members = members?;

    if members.is_empty() {
        return Ok(None);
    }

    let joined = members.join(op.joiner());
    let term = match op {
        LogicalOp::And if members.len() == 1 => joined,
        _ if op.negates() => format!("NOT ({joined})"),
        _ => format!("({joined})"),
    };
    Ok(Some(term))
}

fn compile_members(
    op: LogicalOp,
    value: &Value,
    id: AliasId,
    ctx: &mut ParseContext<'_>,
) -> ParseResult<Vec<String>> {
    let mut members = Vec::new();
    match value {
        Value::Array(items) => {
            for item in items {
                members.extend(compile_member(op, item, id, ctx)?);
            }
        }
        Value::Object(group) => {
            for (key, nested) in group {
                let mut single = Map::with_capacity(1);
                single.insert(key.clone(), nested.clone());
                members.extend(compile_member(op, &Value::Object(single), id, ctx)?);
            }
        }
        other => return Err(ParseError::operand(op.key(), op.key(), other)),
    }
    Ok(members)
}

/// One member of a logical group, conjoined into a single term.
fn compile_member(
    op: LogicalOp,
    member: &Value,
    id: AliasId,
    ctx: &mut ParseContext<'_>,
) -> ParseResult<Option<String>> {
    match member {
        Value::Object(map) => {
            let terms = compile_object(map, id, ctx)?;
            Ok(conjoin(terms))
        }
        Value::Array(_) => compile_logical(LogicalOp::And, member, id, ctx),
        other => Err(ParseError::operand(op.key(), op.key(), other)),
    }
}

fn conjoin(mut terms: Vec<String>) -> Option<String> {
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(format!("({})", terms.join(" AND "))),
    }
}

//! Aggregation compiler.
//!
//! A flat aggregate becomes one `WITH` that computes every output field. An
//! aggregate whose collects roll up nested aggregates is folded bottom-up:
//! each nested level gets its own `WITH`, emitted before its parent, grouped
//! by its ancestor aliases and keeping alive what later statements read.

use crate::error::{ParseError, ParseResult};
use crate::ir::{
    Accumulation, Accumulator, Aggregate, AggregateSpec, Collect, OrderBy, SortDirection,
};
use crate::options::CompileOptions;
use crate::render::literal::{member, name, string};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Single-statement aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatAggregate {
    /// Final record projection
    pub record_part: String,
    /// Root-level output field names
    pub fields: Vec<String>,
    /// `WITH record, expr AS field, ...`
    pub with_part: String,
}

/// One accumulation statement of a nested aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStatement {
    /// Variables carried through the statement, grouping keys first
    pub record_variables: Vec<String>,
    pub with_statement: String,
}

/// Nested aggregation: statements in execution order, deepest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedAggregate {
    pub statements: Vec<AggregateStatement>,
    pub record_part: String,
    /// Root-level output field names
    pub fields: Vec<String>,
}

/// Compiled `aggregate` half of a search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CompiledAggregate {
    Flat(FlatAggregate),
    Nested(NestedAggregate),
}

impl CompiledAggregate {
    /// `WITH` statements in execution order.
    pub fn with_statements(&self) -> Vec<&str> {
        match self {
            Self::Flat(flat) => vec![flat.with_part.as_str()],
            Self::Nested(nested) => nested
                .statements
                .iter()
                .map(|s| s.with_statement.as_str())
                .collect(),
        }
    }

    pub fn record_part(&self) -> &str {
        match self {
            Self::Flat(flat) => &flat.record_part,
            Self::Nested(nested) => &nested.record_part,
        }
    }

    /// Names the final statement binds for the root record.
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Flat(flat) => &flat.fields,
            Self::Nested(nested) => &nested.fields,
        }
    }
}

/// Compile an aggregate, flat unless some collect nests another.
pub fn compile_aggregate(
    spec: &AggregateSpec,
    aliases_map: &BTreeMap<String, String>,
    options: &CompileOptions,
) -> ParseResult<CompiledAggregate> {
    if spec.is_nested() {
        compile_nested(spec, aliases_map, options).map(CompiledAggregate::Nested)
    } else {
        compile_flat(spec, aliases_map, options).map(CompiledAggregate::Flat)
    }
}

/// Compile an aggregate without nested collects into one statement.
pub fn compile_flat(
    spec: &AggregateSpec,
    aliases_map: &BTreeMap<String, String>,
    options: &CompileOptions,
) -> ParseResult<FlatAggregate> {
    let compiler = AggregateCompiler {
        aliases_map,
        options,
    };
    let root = options.root_alias.clone();
    let exprs = compiler.level_exprs(spec)?;

    Ok(FlatAggregate {
        record_part: compiler.record_part(spec),
        fields: field_names(spec),
        with_part: with_statement(&[root], &exprs),
    })
}

/// Fold nested collects into statements, deepest first.
pub fn compile_nested(
    spec: &AggregateSpec,
    aliases_map: &BTreeMap<String, String>,
    options: &CompileOptions,
) -> ParseResult<NestedAggregate> {
    let compiler = AggregateCompiler {
        aliases_map,
        options,
    };
    let mut statements = Vec::new();
    compiler.fold_level(spec, &[options.root_alias.clone()], &[], &mut statements)?;
    debug!(statements = statements.len(), "Folded nested aggregation");

    Ok(NestedAggregate {
        statements,
        record_part: compiler.record_part(spec),
        fields: field_names(spec),
    })
}

struct AggregateCompiler<'a> {
    aliases_map: &'a BTreeMap<String, String>,
    options: &'a CompileOptions,
}

impl AggregateCompiler<'_> {
    /// Emit the statements of every nested child, then this level's.
    ///
    /// `grouping` identifies one output row of this level; `carry` holds the
    /// variables statements after this one still read.
    fn fold_level(
        &self,
        spec: &AggregateSpec,
        grouping: &[String],
        carry: &[String],
        out: &mut Vec<AggregateStatement>,
    ) -> ParseResult<()> {
        let level_aliases = spec
            .fields
            .iter()
            .map(|(field, agg)| self.resolve(field, agg.alias()))
            .collect::<ParseResult<Vec<_>>>()?;

        let mut produced: Vec<String> = Vec::new();
        for (index, (field, agg)) in spec.fields.iter().enumerate() {
            let Some(nested) = agg.nested() else {
                continue;
            };

            let mut child_grouping = grouping.to_vec();
            push_unique(&mut child_grouping, &level_aliases[index]);

            let mut child_carry = carry.to_vec();
            for alias in &level_aliases {
                push_unique(&mut child_carry, alias);
            }
            for earlier in &produced {
                push_unique(&mut child_carry, earlier);
            }
            for (later_field, later) in &spec.fields[index + 1..] {
                for alias in self.subtree_aliases(later_field, later)? {
                    push_unique(&mut child_carry, &alias);
                }
            }

            self.fold_level(nested, &child_grouping, &child_carry, out)?;
            produced.extend(nested.fields.iter().map(|(name, _)| name.clone()));
            debug!(field = %field, depth = child_grouping.len(), "Folded nested collect");
        }

        let mut variables = grouping.to_vec();
        for variable in carry {
            push_unique(&mut variables, variable);
        }
        let exprs = self.level_exprs(spec)?;
        out.push(AggregateStatement {
            with_statement: with_statement(&variables, &exprs),
            record_variables: variables,
        });
        Ok(())
    }

    /// Aliases read anywhere in `agg`'s subtree.
    fn subtree_aliases(&self, field: &str, agg: &Aggregate) -> ParseResult<Vec<String>> {
        let mut aliases = vec![self.resolve(field, agg.alias())?];
        if let Some(nested) = agg.nested() {
            for (child_field, child) in &nested.fields {
                aliases.extend(self.subtree_aliases(child_field, child)?);
            }
        }
        Ok(aliases)
    }

    /// `expr AS field` for every field of one level.
    fn level_exprs(&self, spec: &AggregateSpec) -> ParseResult<Vec<String>> {
        spec.fields
            .iter()
            .map(|(field, agg)| Ok(format!("{} AS {}", self.expr(field, agg)?, name(field))))
            .collect()
    }

    fn expr(&self, field: &str, agg: &Aggregate) -> ParseResult<String> {
        let alias = self.resolve(field, agg.alias())?;
        match agg {
            Aggregate::Accumulate(acc) => Ok(self.accumulate(&alias, acc)),
            Aggregate::Collect(collect) => self.collect(field, &alias, collect),
        }
    }

    fn accumulate(&self, alias: &str, acc: &Accumulation) -> String {
        let target = target(alias, acc.field.as_deref());
        let call = format!("{}({}{target})", acc.function.function(), distinct(acc.uniq));
        match (acc.function, acc.precision) {
            (Accumulator::Avg, Some(precision)) => format!("round({call}, {precision})"),
            _ => call,
        }
    }

    fn collect(&self, field: &str, alias: &str, collect: &Collect) -> ParseResult<String> {
        let skip = collect.skip.unwrap_or(0);
        let limit = collect.limit.unwrap_or(self.options.default_collect_limit);
        let end = skip
            .checked_add(limit)
            .ok_or_else(|| ParseError::InvalidAggregate {
                key: field.to_string(),
                message: format!("collect window skip {skip} + limit {limit} overflows"),
                value: json!({"skip": skip, "limit": limit}),
            })?;
        let slice = format!("[{skip}..{end}]");

        if let Some(source) = &collect.field {
            return Ok(format!(
                "collect({}{}){slice}",
                distinct(collect.uniq),
                member(alias, source)
            ));
        }

        let mut entries = vec![".*".to_string()];
        if let Some(nested) = &collect.aggregate {
            entries.extend(
                nested
                    .fields
                    .iter()
                    .map(|(field, _)| format!("{}: {}", name(field), name(field))),
            );
        }
        entries.push(format!(
            "{}: {}",
            name(&self.options.label_key),
            self.options.label_expr(alias)
        ));

        Ok(format!(
            "apoc.coll.sortMaps(collect({}{alias} {{{}}}), {}){slice}",
            distinct(collect.uniq),
            entries.join(", "),
            string(&self.sort_key(&collect.alias, collect.order_by.as_ref()))
        ))
    }

    /// Sort key for `apoc.coll.sortMaps`; `^` marks ascending.
    fn sort_key(&self, alias: &str, order_by: Option<&OrderBy>) -> String {
        let (key, direction) = match order_by {
            None => (self.options.id_key.as_str(), SortDirection::Asc),
            Some(OrderBy::Direction(direction)) => (self.options.id_key.as_str(), *direction),
            Some(OrderBy::Fields(fields)) => {
                if fields.len() > 1 {
                    warn!(alias, keys = fields.len(), "Collect sorts by one key; using the first");
                }
                match fields.first() {
                    Some((field, direction)) => (field.as_str(), *direction),
                    None => (self.options.id_key.as_str(), SortDirection::Asc),
                }
            }
        };
        match direction {
            SortDirection::Asc => format!("^{key}"),
            SortDirection::Desc => key.to_string(),
        }
    }

    /// Final projection of the root record and its computed fields.
    fn record_part(&self, spec: &AggregateSpec) -> String {
        let root = self.options.root_alias.as_str();
        let mut entries = vec![
            format!(".{}", self.options.id_key),
            format!(".{}", self.options.types_key),
            format!("{}: {}", name(&self.options.label_key), self.options.label_expr(root)),
        ];
        entries.extend(
            spec.fields
                .iter()
                .map(|(field, _)| format!("{}: {}", name(field), name(field))),
        );
        format!("{root} {{{}}}", entries.join(", "))
    }

    fn resolve(&self, field: &str, alias: &str) -> ParseResult<String> {
        self.aliases_map
            .get(alias)
            .cloned()
            .ok_or_else(|| ParseError::UnknownAlias {
                key: field.to_string(),
                value: Value::String(alias.to_string()),
            })
    }
}

fn with_statement(variables: &[String], exprs: &[String]) -> String {
    let parts: Vec<&str> = variables
        .iter()
        .chain(exprs.iter())
        .map(String::as_str)
        .collect();
    format!("WITH {}", parts.join(", "))
}

fn field_names(spec: &AggregateSpec) -> Vec<String> {
    spec.fields.iter().map(|(field, _)| name(field)).collect()
}

fn target(alias: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => member(alias, field),
        None => alias.to_string(),
    }
}

fn distinct(uniq: bool) -> &'static str {
    if uniq {
        "DISTINCT "
    } else {
        ""
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

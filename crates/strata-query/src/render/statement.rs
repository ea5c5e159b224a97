//! Full statement rendering.
//!
//! Interpolates the compiled clauses into the fixed read template:
//!
//! ```text
//! MATCH <root pattern>
//! OPTIONAL MATCH ...            one per relation alias
//! WITH <aliases>
//! WHERE ...
//! WITH record ORDER BY ... SKIP ... LIMIT ...      no relations
//! WITH ...                      aggregation, in execution order
//! WITH ... ORDER BY ... SKIP ... LIMIT ...         relations
//! RETURN <record projection>
//! ```

use crate::options::CompileOptions;
use crate::render::aggregate::CompiledAggregate;
use crate::render::assemble::CompiledWhere;
use crate::render::literal::name;
use crate::render::QueryRenderer;

/// Renders the read template for a property-graph store.
#[derive(Debug, Clone, Default)]
pub struct CypherRenderer {
    options: CompileOptions,
}

impl CypherRenderer {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }
}

impl QueryRenderer for CypherRenderer {
    fn name(&self) -> &str {
        "cypher"
    }

    fn render(&self, compiled: &CompiledWhere, aggregate: Option<&CompiledAggregate>) -> String {
        render_statement(compiled, aggregate, &self.options)
    }
}

/// Render the complete statement for a compiled search.
pub fn render_statement(
    compiled: &CompiledWhere,
    aggregate: Option<&CompiledAggregate>,
    options: &CompileOptions,
) -> String {
    let root = options.root_alias.as_str();
    let mut lines = vec![format!("MATCH {}", compiled.root_pattern)];
    lines.extend(compiled.sorted_query_parts.iter().cloned());
    lines.push(format!("WITH {}", compiled.node_aliases.join(", ")));
    lines.push(compiled.query_clauses.clone());

    if !compiled.has_related_conditions {
        lines.push(format!(
            "WITH {root} {} {}",
            compiled.order_clause, compiled.pagination
        ));
    }

    if let Some(aggregate) = aggregate {
        lines.extend(aggregate.with_statements().into_iter().map(str::to_string));
    }

    if compiled.has_related_conditions {
        let carried = match aggregate {
            Some(aggregate) => {
                let mut variables = vec![root.to_string()];
                variables.extend(aggregate.fields().iter().cloned());
                variables.join(", ")
            }
            None => format!("DISTINCT {root}"),
        };
        lines.push(format!(
            "WITH {carried} {} {}",
            compiled.order_clause,
            compiled.page()
        ));
    }

    let projection = match aggregate {
        Some(aggregate) => aggregate.record_part().to_string(),
        None => format!(
            "{root} {{.*, {}: {}}}",
            name(&options.label_key),
            options.label_expr(root)
        ),
    };
    lines.push(format!("RETURN {projection}"));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::aggregate::compile_aggregate;
    use crate::render::assemble::assemble;
    use crate::syntax::decode_aggregate;
    use serde_json::{json, Value};

    fn compile(criteria: Value, aggregate: Option<Value>) -> String {
        let options = CompileOptions::default();
        let compiled = assemble(&criteria, &["Company".to_string()], None, None, None, &options).unwrap();
        let aggregate = aggregate.map(|spec| {
            compile_aggregate(&decode_aggregate(&spec).unwrap(), &compiled.aliases_map, &options)
                .unwrap()
        });
        render_statement(&compiled, aggregate.as_ref(), &options)
    }

    #[test]
    fn test_plain_statement_paginates_before_return() {
        let statement = compile(json!({"name": "Acme"}), None);
        assert_eq!(
            statement,
            [
                "MATCH (record:__RECORD__:`Company`)",
                "WITH record",
                r#"WHERE (record IS NOT NULL) AND any(value IN record.name WHERE value = "Acme")"#,
                "WITH record ORDER BY record.__id DESC SKIP 0 LIMIT 100",
                r#"RETURN record {.*, __label: [label IN labels(record) WHERE label <> "__RECORD__"][0]}"#,
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_related_statement_defers_pagination() {
        let statement = compile(json!({"EMPLOYEE": {"role": "CTO"}}), None);
        let lines: Vec<&str> = statement.lines().collect();
        assert_eq!(lines[1], r#"OPTIONAL MATCH (record)--(record1:`EMPLOYEE`) WHERE any(value IN record1.role WHERE value = "CTO")"#);
        assert_eq!(lines[2], "WITH record, record1");
        assert_eq!(lines[3], "WHERE (record IS NOT NULL) AND record1 IS NOT NULL");
        assert_eq!(lines[4], "WITH DISTINCT record ORDER BY record.__id DESC SKIP 0 LIMIT 100");
        assert!(lines[5].starts_with("RETURN record {.*"));
    }

    #[test]
    fn test_related_aggregate_paginates_after_aggregation() {
        let statement = compile(
            json!({"EMPLOYEE": {"$alias": "$employee"}}),
            Some(json!({"headcount": {"fn": "count", "alias": "$employee"}, "names": {"fn": "collect", "field": "name", "alias": "$employee"}})),
        );
        let lines: Vec<&str> = statement.lines().collect();
        assert_eq!(
            lines[4],
            "WITH record, count(record1) AS headcount, collect(DISTINCT record1.name)[0..100] AS names"
        );
        assert_eq!(lines[5], "WITH record, headcount, names ORDER BY record.__id DESC SKIP 0 LIMIT 100");
        assert!(lines[6].starts_with("RETURN record {.__id, .__proptypes"));
    }
}

//! Rendering of decoded criteria into query text.
//!
//! [`assemble`] drives the where compiler ([`level`], [`subquery`],
//! [`comparison`]) over a [`ParseContext`]; [`aggregate`] compiles the
//! aggregate half against the aliases the where half registered, and
//! [`statement`] stitches both into one statement.

pub mod aggregate;
pub mod assemble;
pub mod comparison;
pub mod context;
pub mod level;
pub mod literal;
pub mod statement;
pub mod subquery;

pub use aggregate::{
    compile_aggregate, compile_flat, compile_nested, AggregateStatement, CompiledAggregate,
    FlatAggregate, NestedAggregate,
};
pub use assemble::{assemble, CompiledWhere};
pub use comparison::{compile_comparison, compile_identity, ComparisonCompiler};
pub use context::{AliasId, ParseContext};
pub use level::compile_where;
pub use statement::{render_statement, CypherRenderer};
pub use subquery::expand;

/// Trait for rendering the compiled halves of a search into a statement.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Render the statement text
    fn render(&self, compiled: &CompiledWhere, aggregate: Option<&CompiledAggregate>) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use serde_json::json;

    struct MockRenderer;

    impl QueryRenderer for MockRenderer {
        fn name(&self) -> &str {
            "mock"
        }

        fn render(
            &self,
            compiled: &CompiledWhere,
            _aggregate: Option<&CompiledAggregate>,
        ) -> String {
            compiled.query_clauses.clone()
        }
    }

    #[test]
    fn test_renderers_are_interchangeable() {
        let options = CompileOptions::default();
        let compiled = assemble(&json!({"a": 1}), &[], None, None, None, &options).unwrap();
        let renderers: Vec<Box<dyn QueryRenderer>> =
            vec![Box::new(MockRenderer), Box::new(CypherRenderer::new(options))];

        assert_eq!(renderers[0].name(), "mock");
        assert_eq!(
            renderers[0].render(&compiled, None),
            "WHERE (record IS NOT NULL) AND any(value IN record.a WHERE value = 1)"
        );
        assert_eq!(renderers[1].name(), "cypher");
        assert!(renderers[1].render(&compiled, None).starts_with("MATCH (record:__RECORD__)"));
    }
}

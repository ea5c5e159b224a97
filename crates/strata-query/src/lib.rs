//! Search DSL compiler for property-graph stores.
//!
//! Compiles the Mongo-like Where/Aggregate DSL into fragments of a
//! property-graph query language:
//!
//! ```text
//! JSON request → normalize → split/decode → ParseContext → assemble → render
//!                 (transform)   (syntax)       (render)
//! ```
//!
//! Relation sub-queries (`{"EMPLOYEE": {"role": "CTO"}}`) become optional
//! matches on freshly allocated aliases; aggregations fold collected
//! relations bottom-up. Compilation is pure: every call owns its own
//! [`ParseContext`] and produces text, nothing is executed.
//!
//! ```
//! use strata_query::{compile_search, CompileOptions, SearchQuery};
//!
//! let query: SearchQuery = r#"{"where": {"name": "Jack"}}"#.parse().unwrap();
//! let compiled = compile_search(&query, &CompileOptions::default()).unwrap();
//! assert!(compiled.statement.contains(r#"any(value IN record.name WHERE value = "Jack")"#));
//! ```

pub mod error;
pub mod ir;
pub mod options;
pub mod render;
pub mod search;
pub mod syntax;
pub mod transform;

pub use error::{ParseError, ParseResult};
pub use options::CompileOptions;
pub use render::{
    assemble, compile_aggregate, compile_comparison, render_statement, AliasId, CompiledAggregate,
    CompiledWhere, CypherRenderer, ParseContext, QueryRenderer,
};
pub use search::{compile_search, CompiledSearch, SearchQuery};
pub use syntax::{decode_aggregate, decode_expression, split_level};
pub use transform::{normalize, NormalizeTransform, QueryTransform};

//! Criteria transforms.
//!
//! Transforms rewrite the raw DSL before decoding. They are total: any JSON
//! value goes in, a JSON value of the same meaning comes out.

mod normalize;

pub use normalize::{normalize, NormalizeTransform};

use serde_json::Value;

/// Trait for criteria rewrites applied ahead of compilation.
pub trait QueryTransform: Send + Sync {
    /// Unique name for this transform
    fn name(&self) -> &'static str;

    /// Rewrite the criteria
    fn transform(&self, criteria: Value) -> Value;
}

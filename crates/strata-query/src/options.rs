//! Compile options.
//!
//! Names of the internal keys and labels the storage layer uses. The defaults
//! match the storage model; the CLI can override them from its config file.

use serde::{Deserialize, Serialize};

/// Options shared by every compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Alias bound to the anchor record
    pub root_alias: String,

    /// Internal marker label every record carries
    pub record_label: String,

    /// Property holding the internal record identity
    pub id_key: String,

    /// Key the record's declared label is projected under
    pub label_key: String,

    /// Property holding the per-record JSON map of property types
    pub types_key: String,

    /// Stand-in for null inside array-valued properties
    pub null_sentinel: String,

    /// Page size when a search request has no `limit`
    pub default_limit: u64,

    /// Slice length when a `collect` has no `limit`
    pub default_collect_limit: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            root_alias: "record".to_string(),
            record_label: "__RECORD__".to_string(),
            id_key: "__id".to_string(),
            label_key: "__label".to_string(),
            types_key: "__proptypes".to_string(),
            null_sentinel: "__NULL__".to_string(),
            default_limit: 100,
            default_collect_limit: 100,
        }
    }
}

impl CompileOptions {
    /// Expression yielding the declared label, internal marker excluded.
    pub fn label_expr(&self, alias: &str) -> String {
        format!(
            "[label IN labels({alias}) WHERE label <> \"{}\"][0]",
            self.record_label
        )
    }

    /// Expression yielding the per-record type map.
    pub fn types_expr(&self, alias: &str) -> String {
        format!("apoc.convert.fromJsonMap({alias}.{})", self.types_key)
    }
}

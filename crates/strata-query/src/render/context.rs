//! Per-compilation traversal state.
//!
//! A [`ParseContext`] is created by one top-level compile call, threaded by
//! `&mut` through the recursive descent, and consumed when the artifact is
//! assembled. Aliases live in an arena indexed by [`AliasId`]; fragments are
//! keyed by the id, never by a name string.

use crate::options::CompileOptions;
use std::collections::BTreeMap;
use tracing::trace;

/// Dense index of a traversal alias; `AliasId::ROOT` is the anchor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AliasId(pub usize);

impl AliasId {
    pub const ROOT: AliasId = AliasId(0);
}

/// Mutable state of one compilation.
#[derive(Debug)]
pub struct ParseContext<'o> {
    options: &'o CompileOptions,
    /// Current traversal depth
    pub(crate) level: usize,
    /// Depth of enclosing negated groups
    pub(crate) negated: usize,
    /// Alias arena indexed by `AliasId`, root first
    aliases: Vec<AliasSlot>,
    /// Number of aliases bound by a match, root included
    matched: usize,
    /// Number of aliases bound inside existential predicates
    scoped: usize,
    /// User alias name -> generated alias
    aliases_map: BTreeMap<String, String>,
    /// Predicates attached to an alias's own match
    result: BTreeMap<AliasId, Vec<String>>,
    /// Traversal pattern of each matched non-root alias
    patterns: BTreeMap<AliasId, String>,
    /// Predicates that must wait until sibling aliases are matched
    with_query_queue: BTreeMap<AliasId, Vec<String>>,
}

#[derive(Debug)]
struct AliasSlot {
    name: String,
    /// Bound inside an `EXISTS { ... }` predicate rather than a match
    scoped: bool,
}

impl<'o> ParseContext<'o> {
    pub fn new(options: &'o CompileOptions) -> Self {
        let root = options.root_alias.clone();
        let mut aliases_map = BTreeMap::new();
        aliases_map.insert(format!("${root}"), root.clone());
        Self {
            options,
            level: 0,
            negated: 0,
            aliases: vec![AliasSlot {
                name: root,
                scoped: false,
            }],
            matched: 1,
            scoped: 0,
            aliases_map,
            result: BTreeMap::new(),
            patterns: BTreeMap::new(),
            with_query_queue: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &'o CompileOptions {
        self.options
    }

    /// Allocate the next matched relation alias: `record1`, `record2`, ...
    pub fn allocate(&mut self) -> AliasId {
        let name = format!("{}{}", self.options.root_alias, self.matched);
        self.matched += 1;
        self.push(name, false)
    }

    /// Allocate an alias bound only inside an existential predicate:
    /// `record_1`, `record_2`, ...
    pub fn allocate_scoped(&mut self) -> AliasId {
        self.scoped += 1;
        let name = format!("{}_{}", self.options.root_alias, self.scoped);
        self.push(name, true)
    }

    fn push(&mut self, name: String, scoped: bool) -> AliasId {
        let id = AliasId(self.aliases.len());
        trace!(alias = %name, level = self.level, scoped, "Allocated alias");
        self.aliases.push(AliasSlot { name, scoped });
        id
    }

    pub fn alias_name(&self, id: AliasId) -> &str {
        &self.aliases[id.0].name
    }

    /// Number of matched aliases so far, root included.
    pub fn alias_count(&self) -> usize {
        self.matched
    }

    /// Matched aliases in allocation order, root first.
    pub fn matched_aliases(&self) -> impl Iterator<Item = AliasId> + '_ {
        self.aliases
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.scoped)
            .map(|(index, _)| AliasId(index))
    }

    /// Names of the matched aliases, root first.
    pub fn node_aliases(&self) -> Vec<String> {
        self.matched_aliases()
            .map(|id| self.alias_name(id).to_string())
            .collect()
    }

    /// Whether compilation is inside a `$not` / `$nor` group.
    pub fn in_negation(&self) -> bool {
        self.negated > 0
    }

    pub fn aliases_map(&self) -> &BTreeMap<String, String> {
        &self.aliases_map
    }

    /// Register a user-visible alias name for `id`.
    pub fn register_alias(&mut self, user_alias: String, id: AliasId) {
        let name = self.alias_name(id).to_string();
        self.aliases_map.insert(user_alias, name);
    }

    pub fn set_pattern(&mut self, id: AliasId, pattern: String) {
        self.patterns.insert(id, pattern);
    }

    pub fn pattern(&self, id: AliasId) -> Option<&str> {
        self.patterns.get(&id).map(String::as_str)
    }

    pub fn set_result(&mut self, id: AliasId, predicates: Vec<String>) {
        self.result.insert(id, predicates);
    }

    pub fn result(&self, id: AliasId) -> Option<&[String]> {
        self.result.get(&id).map(Vec::as_slice)
    }

    /// Queue predicates for `id` until its sibling aliases are matched.
    pub fn defer(&mut self, id: AliasId, predicates: Vec<String>) {
        self.with_query_queue.entry(id).or_default().extend(predicates);
    }

    /// Take the queued predicates for `id`; a second call returns `None`.
    pub fn take_deferred(&mut self, id: AliasId) -> Option<Vec<String>> {
        self.with_query_queue.remove(&id)
    }

    /// Whether any deferred predicate is still waiting to be emitted.
    pub fn has_pending(&self) -> bool {
        !self.with_query_queue.is_empty()
    }
}

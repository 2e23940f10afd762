//! Entity tables (scopes).
//!
//! A scope is a name→entity mapping keyed to a hosting frame: the root
//! (the unnamed global namespace), a declared namespace, a file, a
//! class or union, or a function body. Scopes are parent-chained only
//! where nesting requires it (function bodies, nested code blocks).

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::entity::EntityId;

/// Index into the scope arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One scope: ordered entries plus the hosting frame.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    /// Entity hosting this scope; None for the root and file tables
    pub host: Option<EntityId>,
    /// Display name of the hosting frame
    pub name: SmolStr,
    /// Parent scope, used in functions with nested code blocks
    pub parent: Option<ScopeId>,
    /// Name (extended name for functions) → entity
    pub entries: IndexMap<SmolStr, EntityId>,
}

impl EntityTable {
    pub fn new(host: Option<EntityId>, name: impl Into<SmolStr>, parent: Option<ScopeId>) -> Self {
        Self {
            host,
            name: name.into(),
            parent,
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

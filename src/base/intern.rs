//! String interner assigning each distinct string a stable 32-bit id.
//!
//! The parallel reverse vector makes id-to-string resolution an index
//! access, which the export and diagnostic layers rely on.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Stable identifier of an interned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(pub u32);

impl StrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Process-wide string deduplication table.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    map: FxHashMap<SmolStr, StrId>,
    strings: Vec<SmolStr>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its stable id. Re-interning the same
    /// string returns the same id.
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(&id) = self.map.get(s) {
            return id;
        }
        let id = StrId(self.strings.len() as u32);
        let owned = SmolStr::new(s);
        self.strings.push(owned.clone());
        self.map.insert(owned, id);
        id
    }

    /// Look up an already-interned string without creating it.
    pub fn get(&self, s: &str) -> Option<StrId> {
        self.map.get(s).copied()
    }

    /// Resolve an id back to its string.
    pub fn resolve(&self, id: StrId) -> &str {
        &self.strings[id.index()]
    }

    /// Number of unique strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_id() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_different_strings() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("world");
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "hello");
        assert_eq!(interner.resolve(b), "world");
    }

    #[test]
    fn test_get_existing() {
        let mut interner = Interner::new();
        interner.intern("exists");
        assert!(interner.get("exists").is_some());
        assert!(interner.get("missing").is_none());
    }
}

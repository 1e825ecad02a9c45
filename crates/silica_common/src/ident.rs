//! Interned identifiers for cheap cloning and O(1) equality comparison.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name — signal, module, parameter, pin, or system-task name.
///
/// Represented as a `u32` index into a session-wide string interner, giving
/// O(1) equality and O(1) cloning. An `Ident` is only meaningful together
/// with the [`Interner`] that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw `u32` index.
    ///
    /// Intended for deserialization and tests. In normal use identifiers come
    /// from [`Interner::intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32`, which always fits in a `usize` on the
// platforms we support. `try_from_usize` rejects values that overflow `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// One interner lives for the whole compilation session; the lexer, parser,
/// and elaborator all intern through it so that name comparisons anywhere in
/// the pipeline are integer comparisons.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning its [`Ident`]. Re-interning an existing
    /// string returns the same identifier without allocating.
    pub fn intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Resolves an [`Ident`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Looks up an already-interned string without interning it.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let interner = Interner::new();
        let id = interner.intern("count");
        assert_eq!(interner.resolve(id), "count");
    }

    #[test]
    fn same_string_same_ident() {
        let interner = Interner::new();
        assert_eq!(interner.intern("clk"), interner.intern("clk"));
    }

    #[test]
    fn different_strings_different_idents() {
        let interner = Interner::new();
        assert_ne!(interner.intern("clk"), interner.intern("rst"));
    }

    #[test]
    fn get_without_interning() {
        let interner = Interner::new();
        assert_eq!(interner.get("never_seen"), None);
        let id = interner.intern("seen");
        assert_eq!(interner.get("seen"), Some(id));
    }

    #[test]
    fn serde_roundtrip() {
        let id = Ident::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}

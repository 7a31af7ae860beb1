//! Identifier newtypes: node ids, de Bruijn levels, metavariables.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque identity of a surface node.
///
/// Ids correlate diagnostics and inferred types with the node they came
/// from. They carry no ownership meaning and are never used for aliasing.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
#[repr(transparent)]
pub struct Id(u32);

impl Id {
    /// Placeholder for nodes synthesized by the compiler itself.
    pub const DUMMY: Id = Id(u32::MAX);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Id(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of fresh [`Id`]s.
///
/// Atomic so that a parser feeding several units can share one generator.
#[derive(Debug, Default)]
pub struct IdGen {
    next: AtomicU32,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh id.
    pub fn fresh(&self) -> Id {
        Id(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// De Bruijn level.
///
/// A binder introduced at context depth `d` is referenced as level `d`
/// everywhere beneath it, so levels never shift when terms move under
/// additional binders.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Default)]
#[repr(transparent)]
pub struct Lvl(u32);

impl Lvl {
    pub const ZERO: Lvl = Lvl(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Lvl(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the level as `usize` (for indexing into environments).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The level `n` binders further in.
    #[inline]
    pub fn plus(self, n: usize) -> Lvl {
        Lvl(self.0.saturating_add(u32::try_from(n).unwrap_or(u32::MAX)))
    }

    #[inline]
    pub fn next(self) -> Lvl {
        self.plus(1)
    }

    /// Level of the `index`-th entry of a context.
    pub fn from_index(index: usize) -> Lvl {
        Lvl(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for Lvl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Metavariable index into the normalizer's solution store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
#[repr(transparent)]
pub struct MetaId(u32);

impl MetaId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        MetaId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MetaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

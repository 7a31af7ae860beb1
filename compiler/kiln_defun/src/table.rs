//! Closure tags and the function table.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};

use kiln_ir::{Binder, Lvl, Term};

/// Source of closure tags.
///
/// Shared by reference between units compiled in parallel; tags are
/// unique for the counter's lifetime. Tags are never negative, so `-1`
/// is free to mean "no closure".
#[derive(Debug, Default)]
pub struct TagCounter(AtomicI32);

impl TagCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of tags handed out so far.
    pub fn issued(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A lifted closure.
///
/// `params` bind levels `depth..depth + params.len()`; `body` mentions no
/// level below `depth`.
#[derive(Clone, Debug, PartialEq)]
pub struct Closure {
    pub depth: Lvl,
    pub params: Vec<Binder>,
    pub body: Term,
}

impl Closure {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Closures by tag, in tag order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionTable {
    closures: BTreeMap<i32, Closure>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: i32, closure: Closure) {
        self.closures.insert(tag, closure);
    }

    pub fn get(&self, tag: i32) -> Option<&Closure> {
        self.closures.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.closures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &Closure)> {
        self.closures.iter().map(|(tag, closure)| (*tag, closure))
    }

    pub fn tags(&self) -> impl Iterator<Item = i32> + '_ {
        self.closures.keys().copied()
    }

    /// Move every closure of `other` into `self`.
    pub fn merge(&mut self, other: FunctionTable) {
        self.closures.extend(other.closures);
    }
}

impl FromIterator<FunctionTable> for FunctionTable {
    fn from_iter<I: IntoIterator<Item = FunctionTable>>(iter: I) -> Self {
        let mut merged = FunctionTable::new();
        for table in iter {
            merged.merge(table);
        }
        merged
    }
}

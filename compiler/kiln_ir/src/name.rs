//! Interned string identifier.
//!
//! Equality and hashing use the 32-bit index. Ordering compares the text, so
//! anything sorted by name (compound fields, effect sets, canonical operand
//! order) comes out the same on every run regardless of intern order.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::interner::StringInterner;

/// Interned string identifier.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Separator between module path segments in qualified names.
    pub const SEPARATOR: char = '/';

    /// Intern `text`.
    pub fn new(text: &str) -> Self {
        StringInterner::global().intern(text)
    }

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// The interned text.
    pub fn as_str(self) -> &'static str {
        StringInterner::global().lookup(self)
    }

    /// `self/child`, or `child` when `self` is empty.
    pub fn join(self, child: Name) -> Name {
        if self == Name::EMPTY {
            child
        } else {
            Name::new(&format!("{}{}{}", self, Self::SEPARATOR, child))
        }
    }

    /// Whether this name carries a module path.
    pub fn is_qualified(self) -> bool {
        self.as_str().contains(Self::SEPARATOR)
    }

    /// The last path segment.
    pub fn last_segment(self) -> &'static str {
        let text = self.as_str();
        text.rsplit(Self::SEPARATOR).next().unwrap_or(text)
    }
}

impl Hash for Name {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            Ordering::Equal
        } else {
            self.as_str().cmp(other.as_str())
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

//! Definition modifiers and effect sets.

use std::collections::BTreeSet;
use std::fmt;

use bitflags::bitflags;

use crate::Name;

bitflags! {
    /// Modifiers carried by definitions and modules.
    ///
    /// Control whether the normalizer may unfold a definition and whether
    /// the packer emits a unit for it.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct Modifiers: u8 {
        /// Body is supplied by the builtin folding/lowering tables.
        const BUILTIN = 1 << 0;
        /// Declared without a usable body; never unfolds.
        const ABSTRACT = 1 << 1;
        /// Compile-time definition: elaborated at the meta stage,
        /// unfolded by the normalizer, never lowered.
        const CONST = 1 << 2;
        /// Member of an opaque module; never unfolds.
        const OPAQUE = 1 << 3;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers::empty()
    }
}

/// Declared effect labels of a function type.
///
/// Ordered so that two sets with the same members compare and print the
/// same way.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Default)]
pub struct EffectSet(BTreeSet<Name>);

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, effect: Name) -> bool {
        self.0.insert(effect)
    }

    pub fn contains(&self, effect: Name) -> bool {
        self.0.contains(&effect)
    }

    /// Every effect of `self` is permitted by `permitted`.
    pub fn is_subset(&self, permitted: &EffectSet) -> bool {
        self.0.is_subset(&permitted.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Name> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Name> for EffectSet {
    fn from_iter<I: IntoIterator<Item = Name>>(iter: I) -> Self {
        EffectSet(iter.into_iter().collect())
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, effect) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{effect}")?;
        }
        f.write_str("}")
    }
}

//! Compile-time model of the runtime stacks.

use kiln_ir::Lvl;

use crate::{Path, Repr};

#[derive(Clone, Debug)]
struct Slot {
    repr: Repr,
    /// Context level bound to this entry, if any.
    level: Option<Lvl>,
}

/// Every value the unit has on the stacks, oldest first, across all kinds.
///
/// A slot's address is a negative index into its own kind's stack, so it
/// depends only on the slots of that kind pushed after it.
#[derive(Clone, Debug, Default)]
pub(super) struct Mirror {
    slots: Vec<Slot>,
}

impl Mirror {
    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn push(&mut self, repr: Repr, level: Option<Lvl>) {
        self.slots.push(Slot { repr, level });
    }

    /// The most recently pushed slot.
    pub(super) fn top(&self) -> usize {
        self.slots.len().saturating_sub(1)
    }

    pub(super) fn repr(&self, slot: usize) -> &Repr {
        &self.slots[slot].repr
    }

    pub(super) fn set_repr(&mut self, slot: usize, repr: Repr) {
        self.slots[slot].repr = repr;
    }

    pub(super) fn bind(&mut self, slot: usize, level: Lvl) {
        self.slots[slot].level = Some(level);
    }

    /// The innermost slot bound to `level`.
    pub(super) fn find(&self, level: Lvl) -> Option<usize> {
        self.slots.iter().rposition(|s| s.level == Some(level))
    }

    pub(super) fn path(&self, slot: usize) -> Path {
        let kind = self.slots[slot].repr.stack();
        let depth = 1 + self.slots[slot + 1..]
            .iter()
            .filter(|s| s.repr.stack() == kind)
            .count();
        Path::stack_slot(kind, i32::try_from(depth).map_or(i32::MIN, |d| -d))
    }

    pub(super) fn remove(&mut self, slot: usize) {
        self.slots.remove(slot);
    }

    pub(super) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }
}

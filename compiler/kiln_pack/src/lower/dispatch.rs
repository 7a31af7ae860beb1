//! The closure dispatcher.

use super::Packer;
use crate::{Condition, DispatchStrategy, Instr, Register, UnitName, DISPATCH};

/// Largest tag range a binary dispatcher node tests linearly.
const LEAF_CASES: usize = 2;

impl Packer<'_> {
    /// Emit `<ns>:dispatch`, which invokes the closure unit whose tag is
    /// in `R0`.
    pub(super) fn dispatcher(&mut self) {
        let tags: Vec<i32> = self.table.tags().collect();
        let unit = self.dispatch_unit();
        match self.options.dispatch {
            DispatchStrategy::Linear => {
                let code = self.cases(&tags);
                self.emit_unit(unit, code);
            }
            DispatchStrategy::Binary => self.binary_node(unit, &tags),
        }
    }

    fn cases(&self, tags: &[i32]) -> Vec<Instr> {
        tags.iter()
            .map(|&tag| {
                Instr::when(
                    Condition::Equals {
                        register: Register::R0,
                        value: tag,
                    },
                    Instr::Invoke {
                        unit: self.closure_unit(tag),
                    },
                )
            })
            .collect()
    }

    /// Split the sorted `tags` in two and range-test each half. The closure
    /// that runs resets `R0` to `-1`, so the second test cannot also fire.
    fn binary_node(&mut self, unit: UnitName, tags: &[i32]) {
        if tags.len() <= LEAF_CASES {
            let code = self.cases(tags);
            self.emit_unit(unit, code);
            return;
        }
        let (low, high) = tags.split_at(tags.len() / 2);
        let mut code = Vec::with_capacity(2);
        for half in [low, high] {
            let (Some(&lo), Some(&hi)) = (half.first(), half.last()) else {
                continue;
            };
            let child = self.unit_name(&format!("{DISPATCH}.{lo}.{hi}"));
            code.push(Instr::when(
                Condition::InRange {
                    register: Register::R0,
                    lo,
                    hi,
                },
                Instr::Invoke {
                    unit: child.clone(),
                },
            ));
            self.binary_node(child, half);
        }
        self.emit_unit(unit, code);
    }
}

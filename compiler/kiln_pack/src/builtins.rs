//! Lowering templates for builtin definitions.

use kiln_ir::Name;
use rustc_hash::FxHashMap;

use crate::{Cmp, Condition, Instr, Nbt, Op, Path, Register, Source, StackKind};

/// Code for one builtin.
///
/// The arguments are the topmost entries of their stacks when `code`
/// runs; it consumes them and leaves one value on `result`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lowering {
    pub params: Vec<StackKind>,
    pub result: StackKind,
    pub code: Vec<Instr>,
}

/// Lowering templates by qualified builtin name.
#[derive(Clone, Debug)]
pub struct LoweringTable {
    templates: FxHashMap<Name, Lowering>,
}

impl LoweringTable {
    pub fn empty() -> Self {
        LoweringTable {
            templates: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, name: &str, lowering: Lowering) {
        self.templates.insert(Name::new(name), lowering);
    }

    pub fn get(&self, name: Name) -> Option<&Lowering> {
        self.templates.get(&name)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.templates.contains_key(&name)
    }
}

impl Default for LoweringTable {
    fn default() -> Self {
        let mut table = LoweringTable::empty();
        for (name, op) in [
            ("int/add", Op::Add),
            ("int/sub", Op::Sub),
            ("int/mul", Op::Mul),
            ("int/div", Op::Div),
            ("int/mod", Op::Mod),
            ("int/min", Op::Min),
            ("int/max", Op::Max),
        ] {
            table.insert(name, int_arith(op));
        }
        table.insert("int/eq", int_compare(Cmp::Eq));
        table.insert("int/lt", int_compare(Cmp::Lt));
        table
    }
}

fn load_operands() -> [Instr; 3] {
    [
        Instr::Get {
            register: Register::R0,
            path: Path::stack_slot(StackKind::Int, -2),
        },
        Instr::Get {
            register: Register::R1,
            path: Path::stack_slot(StackKind::Int, -1),
        },
        Instr::Remove {
            path: Path::stack_slot(StackKind::Int, -1),
        },
    ]
}

/// `R0 op= R1`, written back over the first operand.
fn int_arith(op: Op) -> Lowering {
    let mut code = load_operands().to_vec();
    code.push(Instr::Operate {
        target: Register::R0,
        op,
        source: Register::R1,
    });
    code.push(Instr::Put {
        path: Path::stack_slot(StackKind::Int, -1),
        register: Register::R0,
    });
    Lowering {
        params: vec![StackKind::Int, StackKind::Int],
        result: StackKind::Int,
        code,
    }
}

fn int_compare(cmp: Cmp) -> Lowering {
    let mut code = load_operands().to_vec();
    code.push(Instr::Remove {
        path: Path::stack_slot(StackKind::Int, -1),
    });
    code.push(Instr::Append {
        path: Path::stack(StackKind::Byte),
        source: Source::Value(Nbt::Byte(0)),
    });
    code.push(Instr::StoreCondition {
        path: Path::stack_slot(StackKind::Byte, -1),
        condition: Condition::Compare {
            lhs: Register::R0,
            cmp,
            rhs: Register::R1,
        },
    });
    Lowering {
        params: vec![StackKind::Int, StackKind::Int],
        result: StackKind::Byte,
        code,
    }
}

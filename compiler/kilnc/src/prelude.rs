//! Signatures of the builtin definitions.

use kiln_ir::{Def, DefTable, EffectSet, Id, Modifiers, Name, Param, Term};

/// Binary integer operations, folded by `kiln_nbe::Builtins` and lowered
/// by `kiln_pack::LoweringTable`.
const ARITHMETIC: [&str; 7] = [
    "int/add", "int/sub", "int/mul", "int/div", "int/mod", "int/min", "int/max",
];

const COMPARISONS: [&str; 2] = ["int/eq", "int/lt"];

fn builtin(name: &str, result: Term) -> Def {
    let int = |n: &str| Param::new(Name::new(n), Term::Int);
    Def {
        id: Id::DUMMY,
        name: Name::new(name),
        modifiers: Modifiers::BUILTIN,
        params: vec![int("a"), int("b")],
        result,
        effects: EffectSet::new(),
        body: None,
    }
}

/// A definition table holding every builtin signature. Units compiled
/// against it may call the builtins by name.
pub fn prelude() -> DefTable {
    ARITHMETIC
        .iter()
        .map(|name| builtin(name, Term::Int))
        .chain(COMPARISONS.iter().map(|name| builtin(name, Term::Bool)))
        .collect()
}

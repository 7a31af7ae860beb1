//! Kiln packer - instruction selection for the stack/register target.
//!
//! Lowers defunctionalized items to units of [`Instr`]uctions over twelve
//! typed stacks in one storage and two scratch registers:
//!
//! - every runtime definition and test becomes a unit
//! - every `match` becomes a chain of clause units (see [`lower`])
//! - every closure becomes a unit reached through one dispatcher
//! - builtin calls expand their [`LoweringTable`] template
//!
//! [`machine::Machine`] executes a [`Program`] directly, for tests.

mod builtins;
mod instr;
mod lower;
pub mod machine;
mod nbt;
mod path;
mod repr;

use std::collections::BTreeMap;
use std::fmt;

use kiln_defun::FunctionTable;
use kiln_diagnostic::ErrorCode;
use kiln_ir::{DefTable, Item, Name, Term};

pub use builtins::{Lowering, LoweringTable};
pub use instr::{Cmp, Condition, Instr, Op, Register, Source};
pub use nbt::Nbt;
pub use path::{Path, PathNode};
pub use repr::{Repr, StackKind};

/// Fatal lowering error. Each one means an earlier stage let something
/// through that has no runtime form.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PackError {
    #[error("`{term}` has no runtime form")]
    Residual { term: Term },
    #[error("`{name}` has no runtime unit")]
    Unresolved { name: Name },
    #[error("type `{ty}` has no runtime representation")]
    Unerasable { ty: Term },
    #[error("no lowering template for builtin `{name}`")]
    UnknownBuiltin { name: Name },
    #[error("builtin `{name}` applied to arguments its template does not take")]
    BuiltinSignature { name: Name },
    #[error("closure tag {tag} is not in the function table")]
    UnknownTag { tag: i32 },
    #[error("`{term}` is not a function")]
    NotCallable { term: Term },
    #[error("`{name}` is not on the stack")]
    Unbound { name: Name },
    #[error("pattern does not fit a value of layout `{repr}`")]
    PatternShape { repr: Repr },
}

impl PackError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::E9003
    }
}

/// How the dispatcher selects a closure unit from the tag in `R0`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchStrategy {
    /// One equality test per closure.
    #[default]
    Linear,
    /// Nested range tests over the sorted tags.
    Binary,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackOptions {
    /// Namespace of every emitted unit.
    pub namespace: String,
    /// Storage holding the stacks.
    pub storage: String,
    pub dispatch: DispatchStrategy,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            namespace: "kiln".to_owned(),
            storage: "kiln:runtime".to_owned(),
            dispatch: DispatchStrategy::Linear,
        }
    }
}

/// Name of an emitted unit, `<namespace>:<path>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitName(String);

impl UnitName {
    pub fn new(namespace: &str, path: &str) -> Self {
        UnitName(format!("{namespace}:{path}"))
    }

    /// A unit nested under this one.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        UnitName(format!("{}/{segment}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A packed program.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub namespace: String,
    pub storage: String,
    pub units: BTreeMap<UnitName, Vec<Instr>>,
    /// The closures the dispatcher reaches.
    pub table: FunctionTable,
}

impl Program {
    /// The unit emitted for a definition or test.
    pub fn unit_of(&self, name: Name) -> UnitName {
        UnitName::new(&self.namespace, name.as_str())
    }

    pub fn dispatcher(&self) -> UnitName {
        UnitName::new(&self.namespace, DISPATCH)
    }

    pub fn get(&self, unit: &UnitName) -> Option<&[Instr]> {
        self.units.get(unit).map(Vec::as_slice)
    }
}

pub(crate) const DISPATCH: &str = "dispatch";

/// Lower every runtime definition and test in `units`, every closure in
/// `table`, and the dispatcher.
///
/// `defs` supplies signatures of definitions called from `units` but
/// defined elsewhere (builtins, other compilations); definitions in
/// `units` take precedence.
#[tracing::instrument(level = "debug", skip_all, fields(units = units.len(), closures = table.len()))]
pub fn pack_program(
    units: &[Item],
    table: &FunctionTable,
    defs: &DefTable,
    lowering: &LoweringTable,
    options: &PackOptions,
) -> Result<Program, PackError> {
    lower::Packer::new(units, table, defs, lowering, options).run()
}

#[cfg(test)]
mod tests;

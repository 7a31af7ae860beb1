//! The target instruction set.

use std::fmt;

use crate::{Nbt, Path, UnitName};

/// Scratch counters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    /// Closure tag on entry to the dispatcher; leaf reads in match tests.
    R0,
    /// Match-clause success flag.
    R1,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Register::R0 => "R0",
            Register::R1 => "R1",
        })
    }
}

/// Register arithmetic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Op {
    Add,
    Sub,
    Mul,
    /// Floor division; a zero divisor leaves the target unchanged.
    Div,
    Mod,
    Min,
    Max,
    Assign,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+=",
            Op::Sub => "-=",
            Op::Mul => "*=",
            Op::Div => "/=",
            Op::Mod => "%=",
            Op::Min => "<",
            Op::Max => ">",
            Op::Assign => "=",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cmp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl Cmp {
    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Eq => lhs == rhs,
            Cmp::Ge => lhs >= rhs,
            Cmp::Gt => lhs > rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Eq => "=",
            Cmp::Ge => ">=",
            Cmp::Gt => ">",
        }
    }
}

/// Operand of a store write.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Source {
    Value(Nbt),
    Path(Path),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Value(value) => write!(f, "value {value}"),
            Source::Path(path) => write!(f, "from {path}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    /// `register == value`
    Equals { register: Register, value: i32 },
    /// `lo <= register <= hi`
    InRange { register: Register, lo: i32, hi: i32 },
    Compare {
        lhs: Register,
        cmp: Cmp,
        rhs: Register,
    },
    /// The value at `path` contains `value`.
    Matches { path: Path, value: Nbt },
    Exists { path: Path },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { register, value } => write!(f, "score {register} matches {value}"),
            Condition::InRange { register, lo, hi } => {
                write!(f, "score {register} matches {lo}..{hi}")
            }
            Condition::Compare { lhs, cmp, rhs } => {
                write!(f, "score {lhs} {} {rhs}", cmp.symbol())
            }
            Condition::Matches { path, value } => write!(f, "data {path} {value}"),
            Condition::Exists { path } => write!(f, "data {path}"),
        }
    }
}

/// One target instruction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instr {
    /// Push onto the list or array at `path`.
    Append { path: Path, source: Source },
    Set { path: Path, source: Source },
    Remove { path: Path },
    /// Read a numeric leaf; a missing leaf reads as `0`.
    Get { register: Register, path: Path },
    /// Overwrite an existing numeric leaf, keeping its kind.
    Put { path: Path, register: Register },
    Assign { register: Register, value: i32 },
    Operate {
        target: Register,
        op: Op,
        source: Register,
    },
    If {
        condition: Condition,
        negated: bool,
        body: Box<Instr>,
    },
    /// Write `1b` or `0b` to `path`.
    StoreCondition { path: Path, condition: Condition },
    Invoke { unit: UnitName },
}

impl Instr {
    pub fn when(condition: Condition, body: Instr) -> Instr {
        Instr::If {
            condition,
            negated: false,
            body: Box::new(body),
        }
    }

    pub fn unless(condition: Condition, body: Instr) -> Instr {
        Instr::If {
            condition,
            negated: true,
            body: Box::new(body),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Append { path, source } => write!(f, "data modify {path} append {source}"),
            Instr::Set { path, source } => write!(f, "data modify {path} set {source}"),
            Instr::Remove { path } => write!(f, "data remove {path}"),
            Instr::Get { register, path } => {
                write!(f, "execute store result score {register} run data get {path}")
            }
            Instr::Put { path, register } => {
                write!(f, "execute store result {path} run scoreboard players get {register}")
            }
            Instr::Assign { register, value } => {
                write!(f, "scoreboard players set {register} {value}")
            }
            Instr::Operate { target, op, source } => write!(
                f,
                "scoreboard players operation {target} {} {source}",
                op.symbol()
            ),
            Instr::If {
                condition,
                negated,
                body,
            } => {
                let kw = if *negated { "unless" } else { "if" };
                write!(f, "execute {kw} {condition} run {body}")
            }
            Instr::StoreCondition { path, condition } => {
                write!(f, "execute store success {path} if {condition}")
            }
            Instr::Invoke { unit } => write!(f, "function {unit}"),
        }
    }
}

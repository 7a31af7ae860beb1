//! Reference machine.
//!
//! Executes a [`Program`] against an in-memory store and the two scratch
//! registers, the way the target would. Used to check that lowered code
//! computes what the source means.

use std::collections::BTreeMap;

use kiln_stack::ensure_sufficient_stack;

use crate::{Condition, Instr, Nbt, Op, Path, PathNode, Program, Register, Source, StackKind, UnitName};

/// Instructions executed before [`MachineError::BudgetExhausted`].
pub const DEFAULT_BUDGET: u64 = 1_000_000;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MachineError {
    #[error("no unit named `{unit}`")]
    UnknownUnit { unit: UnitName },
    /// The path crosses a value of the wrong kind, or a write target is
    /// missing.
    #[error("invalid path `{path}`")]
    InvalidPath { path: Path },
    #[error("`{path}` does not hold a number")]
    NotNumeric { path: Path },
    #[error("cannot store `{value}` at `{path}`")]
    KindMismatch { path: Path, value: Nbt },
    #[error("step budget of {budget} exhausted")]
    BudgetExhausted { budget: u64 },
}

pub struct Machine<'p> {
    program: &'p Program,
    storage: Nbt,
    registers: [i32; 2],
    steps: u64,
    budget: u64,
    trace: Vec<UnitName>,
}

impl<'p> Machine<'p> {
    /// A machine with every stack empty.
    pub fn new(program: &'p Program) -> Self {
        let stacks = StackKind::ALL
            .iter()
            .map(|kind| (kind.name().to_owned(), Nbt::List(Vec::new())))
            .collect();
        let root = BTreeMap::from([("stack".to_owned(), Nbt::Compound(stacks))]);
        Machine {
            program,
            storage: Nbt::Compound(root),
            registers: [0; 2],
            steps: 0,
            budget: DEFAULT_BUDGET,
            trace: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget;
        self
    }

    pub fn run(&mut self, unit: &UnitName) -> Result<(), MachineError> {
        self.call(unit)
    }

    /// Contents of a stack, bottom first.
    pub fn stack(&self, kind: StackKind) -> &[Nbt] {
        match &self.storage {
            Nbt::Compound(root) => match root.get("stack") {
                Some(Nbt::Compound(stacks)) => match stacks.get(kind.name()) {
                    Some(Nbt::List(items)) => items.as_slice(),
                    _ => &[],
                },
                _ => &[],
            },
            _ => &[],
        }
    }

    pub fn register(&self, register: Register) -> i32 {
        self.registers[slot(register)]
    }

    pub fn storage(&self) -> &Nbt {
        &self.storage
    }

    /// Every unit entered so far, in order.
    pub fn trace(&self) -> &[UnitName] {
        &self.trace
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn call(&mut self, unit: &UnitName) -> Result<(), MachineError> {
        let program = self.program;
        let code = program
            .get(unit)
            .ok_or_else(|| MachineError::UnknownUnit { unit: unit.clone() })?;
        self.trace.push(unit.clone());
        ensure_sufficient_stack(|| code.iter().try_for_each(|instr| self.exec(instr)))
    }

    fn exec(&mut self, instr: &Instr) -> Result<(), MachineError> {
        self.steps += 1;
        if self.steps > self.budget {
            return Err(MachineError::BudgetExhausted {
                budget: self.budget,
            });
        }
        match instr {
            Instr::Append { path, source } => {
                let value = self.source(source)?;
                self.append(path, value)
            }
            Instr::Set { path, source } => {
                let value = self.source(source)?;
                self.set(path, value)
            }
            Instr::Remove { path } => self.remove(path),
            Instr::Get { register, path } => {
                let value = match self.read(path)? {
                    Some(leaf) => leaf
                        .as_register()
                        .ok_or_else(|| MachineError::NotNumeric { path: path.clone() })?,
                    None => 0,
                };
                self.registers[slot(*register)] = value;
                Ok(())
            }
            Instr::Put { path, register } => {
                let current = self
                    .read(path)?
                    .ok_or_else(|| MachineError::InvalidPath { path: path.clone() })?;
                let value = current
                    .with_register(self.register(*register))
                    .ok_or_else(|| MachineError::NotNumeric { path: path.clone() })?;
                self.set(path, value)
            }
            Instr::Assign { register, value } => {
                self.registers[slot(*register)] = *value;
                Ok(())
            }
            Instr::Operate { target, op, source } => {
                let lhs = self.register(*target);
                let rhs = self.register(*source);
                self.registers[slot(*target)] = operate(*op, lhs, rhs);
                Ok(())
            }
            Instr::If {
                condition,
                negated,
                body,
            } => {
                if self.test(condition)? != *negated {
                    self.exec(body)?;
                }
                Ok(())
            }
            Instr::StoreCondition { path, condition } => {
                let holds = self.test(condition)?;
                self.set(path, Nbt::Byte(i8::from(holds)))
            }
            Instr::Invoke { unit } => self.call(unit),
        }
    }

    fn test(&self, condition: &Condition) -> Result<bool, MachineError> {
        Ok(match condition {
            Condition::Equals { register, value } => self.register(*register) == *value,
            Condition::InRange { register, lo, hi } => (*lo..=*hi).contains(&self.register(*register)),
            Condition::Compare { lhs, cmp, rhs } => cmp.holds(self.register(*lhs), self.register(*rhs)),
            Condition::Matches { path, value } => self.read(path)?.is_some_and(|v| v.contains(value)),
            Condition::Exists { path } => self.read(path)?.is_some(),
        })
    }

    fn source(&self, source: &Source) -> Result<Nbt, MachineError> {
        match source {
            Source::Value(value) => Ok(value.clone()),
            Source::Path(path) => self
                .read(path)?
                .ok_or_else(|| MachineError::InvalidPath { path: path.clone() }),
        }
    }

    /// The value at `path`, or `None` if some node is missing.
    fn read(&self, path: &Path) -> Result<Option<Nbt>, MachineError> {
        let invalid = || MachineError::InvalidPath { path: path.clone() };
        let nodes = path.nodes();
        let mut current = &self.storage;
        for (i, node) in nodes.iter().enumerate() {
            let next = match (current, node) {
                (Nbt::Compound(fields), PathNode::Key(key)) => fields.get(key),
                (Nbt::List(items), PathNode::Index(n)) => position(items.len(), *n).map(|i| &items[i]),
                (array, PathNode::Index(n)) if i + 1 == nodes.len() => {
                    return array_get(array, *n).ok_or_else(invalid);
                }
                _ => return Err(invalid()),
            };
            match next {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current.clone()))
    }

    /// The existing compound or list at `path`.
    fn node_mut(&mut self, path: &Path) -> Result<&mut Nbt, MachineError> {
        let mut current = &mut self.storage;
        for node in path.nodes() {
            let next = match (current, node) {
                (Nbt::Compound(fields), PathNode::Key(key)) => fields.get_mut(key),
                (Nbt::List(items), PathNode::Index(n)) => {
                    let at = position(items.len(), *n);
                    at.and_then(move |i| items.get_mut(i))
                }
                _ => None,
            };
            current = next.ok_or_else(|| MachineError::InvalidPath { path: path.clone() })?;
        }
        Ok(current)
    }

    fn append(&mut self, path: &Path, value: Nbt) -> Result<(), MachineError> {
        let mismatch = |value: Nbt| MachineError::KindMismatch {
            path: path.clone(),
            value,
        };
        match (self.node_mut(path)?, value) {
            (Nbt::List(items), value) => items.push(value),
            (Nbt::ByteArray(items), Nbt::Byte(n)) => items.push(n),
            (Nbt::IntArray(items), Nbt::Int(n)) => items.push(n),
            (Nbt::LongArray(items), Nbt::Long(n)) => items.push(n),
            (_, value) => return Err(mismatch(value)),
        }
        Ok(())
    }

    fn set(&mut self, path: &Path, value: Nbt) -> Result<(), MachineError> {
        let invalid = || MachineError::InvalidPath { path: path.clone() };
        let (parent, last) = path.split_last().ok_or_else(invalid)?;
        let mismatch = |value: Nbt| MachineError::KindMismatch {
            path: path.clone(),
            value,
        };
        match (self.node_mut(&parent)?, last) {
            (Nbt::Compound(fields), PathNode::Key(key)) => {
                fields.insert(key.clone(), value);
            }
            (Nbt::List(items), PathNode::Index(n)) => {
                let i = position(items.len(), *n).ok_or_else(invalid)?;
                items[i] = value;
            }
            (array, PathNode::Index(n)) => {
                let len = array_len(array).ok_or_else(invalid)?;
                let i = position(len, *n).ok_or_else(invalid)?;
                match (array, value) {
                    (Nbt::ByteArray(items), Nbt::Byte(v)) => items[i] = v,
                    (Nbt::IntArray(items), Nbt::Int(v)) => items[i] = v,
                    (Nbt::LongArray(items), Nbt::Long(v)) => items[i] = v,
                    (_, value) => return Err(mismatch(value)),
                }
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), MachineError> {
        let invalid = || MachineError::InvalidPath { path: path.clone() };
        let (parent, last) = path.split_last().ok_or_else(invalid)?;
        match (self.node_mut(&parent)?, last) {
            (Nbt::Compound(fields), PathNode::Key(key)) => {
                fields.remove(key).ok_or_else(invalid)?;
            }
            (Nbt::List(items), PathNode::Index(n)) => {
                let i = position(items.len(), *n).ok_or_else(invalid)?;
                items.remove(i);
            }
            (Nbt::ByteArray(items), PathNode::Index(n)) => {
                let i = position(items.len(), *n).ok_or_else(invalid)?;
                items.remove(i);
            }
            (Nbt::IntArray(items), PathNode::Index(n)) => {
                let i = position(items.len(), *n).ok_or_else(invalid)?;
                items.remove(i);
            }
            (Nbt::LongArray(items), PathNode::Index(n)) => {
                let i = position(items.len(), *n).ok_or_else(invalid)?;
                items.remove(i);
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }
}

fn slot(register: Register) -> usize {
    match register {
        Register::R0 => 0,
        Register::R1 => 1,
    }
}

fn operate(op: Op, lhs: i32, rhs: i32) -> i32 {
    match op {
        Op::Add => lhs.wrapping_add(rhs),
        Op::Sub => lhs.wrapping_sub(rhs),
        Op::Mul => lhs.wrapping_mul(rhs),
        Op::Div => kiln_ir::arith::floor_div(lhs, rhs).unwrap_or(lhs),
        Op::Mod => kiln_ir::arith::floor_mod(lhs, rhs).unwrap_or(lhs),
        Op::Min => lhs.min(rhs),
        Op::Max => lhs.max(rhs),
        Op::Assign => rhs,
    }
}

/// Position of index `n` in a sequence of `len`; negative counts from the
/// end.
fn position(len: usize, n: i32) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let at = if n < 0 { len + i64::from(n) } else { i64::from(n) };
    if (0..len).contains(&at) {
        usize::try_from(at).ok()
    } else {
        None
    }
}

fn array_len(array: &Nbt) -> Option<usize> {
    match array {
        Nbt::ByteArray(items) => Some(items.len()),
        Nbt::IntArray(items) => Some(items.len()),
        Nbt::LongArray(items) => Some(items.len()),
        _ => None,
    }
}

/// Element `n` of an array: `None` when `array` is not an array.
fn array_get(array: &Nbt, n: i32) -> Option<Option<Nbt>> {
    Some(match array {
        Nbt::ByteArray(items) => position(items.len(), n).map(|i| Nbt::Byte(items[i])),
        Nbt::IntArray(items) => position(items.len(), n).map(|i| Nbt::Int(items[i])),
        Nbt::LongArray(items) => position(items.len(), n).map(|i| Nbt::Long(items[i])),
        _ => return None,
    })
}

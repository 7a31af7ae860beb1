//! Term → instruction lowering.
//!
//! # Calling convention
//!
//! A unit finds its relevant parameters on their stacks, pushes exactly
//! one result, and removes the parameters from beneath it. Closure units
//! also reset `R0` to `-1` before returning, so no later dispatcher test
//! can fire on a stale tag.
//!
//! # Match protocol
//!
//! The scrutinee is pushed and the first clause unit invoked. A clause
//! unit sets `R1 = 1`, runs one test per literal leaf of its pattern (each
//! failing test clears `R1`), then invokes its body unit when `R1 == 1`
//! and the next clause unit when `R1 == 0`. A body unit copies the pattern
//! variables out of the scrutinee, drops it, lowers the clause body, drops
//! the variables and restores `R1 = 1`. The final clause is unconditional.
//!
//! Lowering tracks the runtime stacks in a [`Mirror`], so every variable
//! is addressed by a fixed negative index.

mod dispatch;
mod matches;
mod mirror;

use std::collections::BTreeMap;

use kiln_defun::FunctionTable;
use kiln_ir::{Def, DefTable, Item, Lvl, Modifiers, Name, Term, Test};
use kiln_stack::ensure_sufficient_stack;
use rustc_hash::FxHashMap;

use crate::{
    Instr, Lowering, LoweringTable, Nbt, PackError, PackOptions, Path, Program, Register, Repr,
    Source, StackKind, UnitName, DISPATCH,
};

use self::mirror::Mirror;

/// The unit being emitted.
struct Frame {
    /// Top-level unit that sub-units are named under.
    root: UnitName,
    code: Vec<Instr>,
    mirror: Mirror,
    depth: Lvl,
}

pub(crate) struct Packer<'a> {
    items: &'a [Item],
    table: &'a FunctionTable,
    /// Signatures by name: `items` first, then the shared table.
    sigs: FxHashMap<Name, &'a Def>,
    lowering: &'a LoweringTable,
    options: &'a PackOptions,
    units: BTreeMap<UnitName, Vec<Instr>>,
    /// Result layout of each closure unit already emitted.
    closures: FxHashMap<i32, Repr>,
    /// Next match number under each root.
    matches: FxHashMap<UnitName, u32>,
    frame: Frame,
}

impl<'a> Packer<'a> {
    pub(crate) fn new(
        items: &'a [Item],
        table: &'a FunctionTable,
        defs: &'a DefTable,
        lowering: &'a LoweringTable,
        options: &'a PackOptions,
    ) -> Self {
        let mut sigs = FxHashMap::default();
        for item in items {
            collect_sigs(item, &mut sigs);
        }
        for def in defs.iter() {
            sigs.entry(def.name).or_insert(&**def);
        }
        Packer {
            items,
            table,
            sigs,
            lowering,
            options,
            units: BTreeMap::new(),
            closures: FxHashMap::default(),
            matches: FxHashMap::default(),
            frame: Frame {
                root: UnitName::new(&options.namespace, ""),
                code: Vec::new(),
                mirror: Mirror::default(),
                depth: Lvl::ZERO,
            },
        }
    }

    pub(crate) fn run(mut self) -> Result<Program, PackError> {
        let items = self.items;
        for item in items {
            self.item(item)?;
        }
        let table = self.table;
        for tag in table.tags() {
            self.closure(tag)?;
        }
        if !table.is_empty() {
            self.dispatcher();
        }
        Ok(Program {
            namespace: self.options.namespace.clone(),
            storage: self.options.storage.clone(),
            units: self.units,
            table: table.clone(),
        })
    }

    fn unit_name(&self, path: &str) -> UnitName {
        UnitName::new(&self.options.namespace, path)
    }

    fn closure_unit(&self, tag: i32) -> UnitName {
        self.unit_name(&format!("closure.{tag}"))
    }

    fn dispatch_unit(&self) -> UnitName {
        self.unit_name(DISPATCH)
    }

    fn item(&mut self, item: &'a Item) -> Result<(), PackError> {
        match item {
            Item::Def(def) if def.is_lowered() => self.def(def),
            Item::Def(_) => Ok(()),
            Item::Mod(module) => module.items.iter().try_for_each(|i| self.item(i)),
            Item::Test(test) => self.test(test),
        }
    }

    fn def(&mut self, def: &'a Def) -> Result<(), PackError> {
        let Some(body) = &def.body else {
            return Ok(());
        };
        let mut mirror = Mirror::default();
        for (i, param) in def.params.iter().enumerate() {
            if param.relevant {
                mirror.push(Repr::of_type(&param.ty)?, Some(Lvl::from_index(i)));
            }
        }
        let name = self.unit_name(def.name.as_str());
        let depth = Lvl::from_index(def.params.len());
        self.in_unit(name.clone(), name, mirror, depth, |p| p.returning(body))?;
        Ok(())
    }

    /// A test leaves its result on the stack for the harness to read.
    fn test(&mut self, test: &Test) -> Result<(), PackError> {
        let name = self.unit_name(test.name.as_str());
        self.in_unit(name.clone(), name, Mirror::default(), Lvl::ZERO, |p| {
            p.lower(&test.body)
        })?;
        Ok(())
    }

    /// Emit the unit for closure `tag` unless already done; its result
    /// layout.
    fn closure(&mut self, tag: i32) -> Result<Repr, PackError> {
        if let Some(repr) = self.closures.get(&tag) {
            return Ok(repr.clone());
        }
        let table = self.table;
        let closure = table.get(tag).ok_or(PackError::UnknownTag { tag })?;
        let mut mirror = Mirror::default();
        for (i, binder) in closure.params.iter().enumerate() {
            if binder.relevant {
                mirror.push(Repr::of_type(&binder.ty)?, Some(closure.depth.plus(i)));
            }
        }
        let name = self.closure_unit(tag);
        let depth = closure.depth.plus(closure.arity());
        let repr = self.in_unit(name.clone(), name, mirror, depth, |p| {
            let repr = p.returning(&closure.body)?;
            p.emit(Instr::Assign {
                register: Register::R0,
                value: -1,
            });
            Ok(repr)
        })?;
        tracing::trace!(tag, %repr, "closure lowered");
        self.closures.insert(tag, repr.clone());
        Ok(repr)
    }

    /// Run `f` with a fresh unit as the emission target, then record it.
    fn in_unit<T>(
        &mut self,
        name: UnitName,
        root: UnitName,
        mirror: Mirror,
        depth: Lvl,
        f: impl FnOnce(&mut Self) -> Result<T, PackError>,
    ) -> Result<T, PackError> {
        let frame = Frame {
            root,
            code: Vec::new(),
            mirror,
            depth,
        };
        let saved = std::mem::replace(&mut self.frame, frame);
        let out = f(self);
        let done = std::mem::replace(&mut self.frame, saved);
        let out = out?;
        self.emit_unit(name, done.code);
        Ok(out)
    }

    fn emit_unit(&mut self, name: UnitName, code: Vec<Instr>) {
        tracing::debug!(unit = %name, instrs = code.len(), "unit emitted");
        self.units.insert(name, code);
    }

    fn emit(&mut self, instr: Instr) {
        self.frame.code.push(instr);
    }

    fn push_value(&mut self, value: Nbt, repr: Repr) {
        self.emit(Instr::Append {
            path: Path::stack(repr.stack()),
            source: Source::Value(value),
        });
        self.frame.mirror.push(repr, None);
    }

    fn drop_slot(&mut self, slot: usize) {
        let path = self.frame.mirror.path(slot);
        self.emit(Instr::Remove { path });
        self.frame.mirror.remove(slot);
    }

    /// Lower a unit body, then remove everything beneath its result.
    fn returning(&mut self, body: &Term) -> Result<Repr, PackError> {
        let repr = self.lower(body)?;
        let result = self.frame.mirror.top();
        for slot in (0..result).rev() {
            self.drop_slot(slot);
        }
        Ok(repr)
    }

    /// Lower `term`, leaving its value as one new slot on top.
    fn lower(&mut self, term: &Term) -> Result<Repr, PackError> {
        ensure_sufficient_stack(|| self.lower_inner(term))
    }

    fn lower_inner(&mut self, term: &Term) -> Result<Repr, PackError> {
        if let (Some(value), Some(repr)) = (Nbt::from_literal(term), Repr::of_literal(term)) {
            self.push_value(value, repr.clone());
            return Ok(repr);
        }
        match term {
            Term::Var { name, level } => {
                let slot = self
                    .frame
                    .mirror
                    .find(*level)
                    .ok_or(PackError::Unbound { name: *name })?;
                let repr = self.frame.mirror.repr(slot).clone();
                let from = self.frame.mirror.path(slot);
                self.emit(Instr::Append {
                    path: Path::stack(repr.stack()),
                    source: Source::Path(from),
                });
                self.frame.mirror.push(repr.clone(), None);
                Ok(repr)
            }
            Term::Def(name) => self.call_def(*name, &[]),
            Term::Let {
                name,
                ty,
                init,
                body,
            } => {
                let init_repr = self.lower(init)?;
                let slot = self.frame.mirror.top();
                // The annotation keeps closure layouts that a bare tag loses.
                if let Ok(repr) = Repr::of_type(ty) {
                    if repr.stack() == init_repr.stack() {
                        self.frame.mirror.set_repr(slot, repr);
                    }
                }
                let level = self.frame.depth;
                self.frame.mirror.bind(slot, level);
                self.frame.depth = level.next();
                let repr = self.lower(body)?;
                self.frame.depth = level;
                let slot = self
                    .frame
                    .mirror
                    .find(level)
                    .ok_or(PackError::Unbound { name: *name })?;
                self.drop_slot(slot);
                Ok(repr)
            }
            Term::Match { scrutinee, clauses } => self.lower_match(scrutinee, clauses),
            Term::Apply { func, args } => self.lower_apply(func, args),
            Term::ByteArrayOf(elems) => {
                self.fill_sequence(Nbt::ByteArray(Vec::new()), Repr::ByteArray, elems)?;
                Ok(Repr::ByteArray)
            }
            Term::IntArrayOf(elems) => {
                self.fill_sequence(Nbt::IntArray(Vec::new()), Repr::IntArray, elems)?;
                Ok(Repr::IntArray)
            }
            Term::LongArrayOf(elems) => {
                self.fill_sequence(Nbt::LongArray(Vec::new()), Repr::LongArray, elems)?;
                Ok(Repr::LongArray)
            }
            Term::ListOf(elems) => {
                let placeholder = Repr::List(Box::new(Repr::Empty));
                let reprs = self.fill_sequence(Nbt::List(Vec::new()), placeholder, elems)?;
                let elem = reprs.into_iter().next().unwrap_or(Repr::Empty);
                Ok(self.settle(Repr::List(Box::new(elem))))
            }
            Term::RefOf(elem) => {
                let placeholder = Repr::Ref(Box::new(Repr::Empty));
                let reprs =
                    self.fill_sequence(Nbt::List(Vec::new()), placeholder, std::slice::from_ref(&**elem))?;
                let elem = reprs.into_iter().next().unwrap_or(Repr::Empty);
                Ok(self.settle(Repr::Ref(Box::new(elem))))
            }
            Term::CompoundOf(fields) => {
                let keyed = fields.iter().map(|(k, v)| (k.as_str().to_owned(), v));
                let reprs = self.fill_compound(Repr::Compound(Vec::new()), keyed)?;
                let fields = fields.iter().map(|(k, _)| *k).zip(reprs).collect();
                Ok(self.settle(Repr::Compound(fields)))
            }
            Term::TupleOf(elems) => {
                let keyed = elems.iter().enumerate().map(|(i, v)| (i.to_string(), v));
                let reprs = self.fill_compound(Repr::Tuple(Vec::new()), keyed)?;
                Ok(self.settle(Repr::Tuple(reprs)))
            }
            other => Err(PackError::Residual {
                term: other.clone(),
            }),
        }
    }

    /// Record the final layout of the aggregate just built.
    fn settle(&mut self, repr: Repr) -> Repr {
        let top = self.frame.mirror.top();
        self.frame.mirror.set_repr(top, repr.clone());
        repr
    }

    /// Push `empty`, then append each element to it.
    fn fill_sequence(
        &mut self,
        empty: Nbt,
        placeholder: Repr,
        elems: &[Term],
    ) -> Result<Vec<Repr>, PackError> {
        self.push_value(empty, placeholder);
        let aggregate = self.frame.mirror.top();
        let mut reprs = Vec::with_capacity(elems.len());
        for elem in elems {
            let source = self.element_source(elem, &mut reprs)?;
            let path = self.frame.mirror.path(aggregate);
            self.emit(Instr::Append { path, source });
            self.pop_element(aggregate);
        }
        Ok(reprs)
    }

    /// Push `{}`, then set each field of it.
    fn fill_compound<'t>(
        &mut self,
        placeholder: Repr,
        fields: impl Iterator<Item = (String, &'t Term)>,
    ) -> Result<Vec<Repr>, PackError> {
        self.push_value(Nbt::compound(), placeholder);
        let aggregate = self.frame.mirror.top();
        let mut reprs = Vec::new();
        for (key, value) in fields {
            let source = self.element_source(value, &mut reprs)?;
            let path = self.frame.mirror.path(aggregate).key(key);
            self.emit(Instr::Set { path, source });
            self.pop_element(aggregate);
        }
        Ok(reprs)
    }

    /// A constant element is written directly; anything else is lowered
    /// to its own slot first.
    fn element_source(&mut self, elem: &Term, reprs: &mut Vec<Repr>) -> Result<Source, PackError> {
        if let (Some(value), Some(repr)) = (Nbt::from_literal(elem), Repr::of_literal(elem)) {
            reprs.push(repr);
            return Ok(Source::Value(value));
        }
        reprs.push(self.lower(elem)?);
        let top = self.frame.mirror.top();
        Ok(Source::Path(self.frame.mirror.path(top)))
    }

    fn pop_element(&mut self, aggregate: usize) {
        let top = self.frame.mirror.top();
        if top != aggregate {
            self.drop_slot(top);
        }
    }

    fn lower_apply(&mut self, func: &Term, args: &[Term]) -> Result<Repr, PackError> {
        match func {
            Term::Def(name) => self.call_def(*name, args),
            Term::IntOf(tag) => {
                let table = self.table;
                let closure = table.get(*tag).ok_or(PackError::UnknownTag { tag: *tag })?;
                let result = self.closure(*tag)?;
                let pushed = self.push_args(args, closure.params.iter().map(|b| b.relevant))?;
                self.emit(Instr::Assign {
                    register: Register::R0,
                    value: *tag,
                });
                Ok(self.invoke(self.dispatch_unit(), pushed, result))
            }
            callee => {
                let Repr::Fun { params, result } = self.lower(callee)? else {
                    return Err(PackError::NotCallable {
                        term: callee.clone(),
                    });
                };
                let slot = self.frame.mirror.top();
                let pushed = self.push_args(args, params.iter().map(Option::is_some))?;
                let path = self.frame.mirror.path(slot);
                self.emit(Instr::Get {
                    register: Register::R0,
                    path,
                });
                self.drop_slot(slot);
                Ok(self.invoke(self.dispatch_unit(), pushed, *result))
            }
        }
    }

    /// Lower the relevant arguments left to right; how many were pushed.
    fn push_args(
        &mut self,
        args: &[Term],
        relevant: impl Iterator<Item = bool>,
    ) -> Result<usize, PackError> {
        let mut pushed = 0;
        for (arg, relevant) in args.iter().zip(relevant) {
            if relevant {
                self.lower(arg)?;
                pushed += 1;
            }
        }
        Ok(pushed)
    }

    /// Call `unit`, which consumes the `pushed` topmost slots and leaves
    /// a `result`.
    fn invoke(&mut self, unit: UnitName, pushed: usize, result: Repr) -> Repr {
        self.emit(Instr::Invoke { unit });
        self.consume(pushed, result)
    }

    fn consume(&mut self, pushed: usize, result: Repr) -> Repr {
        let len = self.frame.mirror.len();
        self.frame.mirror.truncate(len.saturating_sub(pushed));
        self.frame.mirror.push(result.clone(), None);
        result
    }

    fn call_def(&mut self, name: Name, args: &[Term]) -> Result<Repr, PackError> {
        let lowering = self.lowering;
        if let Some(template) = lowering.get(name) {
            return self.call_builtin(name, template, args);
        }
        let def = self
            .sigs
            .get(&name)
            .copied()
            .ok_or(PackError::Unresolved { name })?;
        if def.modifiers.contains(Modifiers::BUILTIN) {
            return Err(PackError::UnknownBuiltin { name });
        }
        if !def.is_lowered() {
            return Err(PackError::Unresolved { name });
        }
        if args.is_empty() && !def.params.is_empty() {
            return Err(PackError::Residual {
                term: Term::Def(name),
            });
        }
        let result = Repr::of_type(&def.result)?;
        let pushed = self.push_args(args, def.params.iter().map(|p| p.relevant))?;
        Ok(self.invoke(self.unit_name(name.as_str()), pushed, result))
    }

    fn call_builtin(
        &mut self,
        name: Name,
        template: &Lowering,
        args: &[Term],
    ) -> Result<Repr, PackError> {
        let def = self.sigs.get(&name).copied();
        let base = self.frame.mirror.len();
        let pushed = match def {
            Some(def) => self.push_args(args, def.params.iter().map(|p| p.relevant))?,
            None => self.push_args(args, std::iter::repeat(true))?,
        };
        let kinds: Vec<StackKind> = (base..base + pushed)
            .map(|slot| self.frame.mirror.repr(slot).stack())
            .collect();
        if kinds != template.params {
            return Err(PackError::BuiltinSignature { name });
        }
        let result = match def {
            Some(def) => Repr::of_type(&def.result)?,
            None => scalar(template.result),
        };
        if result.stack() != template.result {
            return Err(PackError::BuiltinSignature { name });
        }
        self.frame.code.extend(template.code.iter().cloned());
        Ok(self.consume(pushed, result))
    }

    /// Next match number under the current root.
    fn next_match(&mut self) -> u32 {
        let next = self.matches.entry(self.frame.root.clone()).or_default();
        let id = *next;
        *next += 1;
        id
    }
}

fn collect_sigs<'a>(item: &'a Item, sigs: &mut FxHashMap<Name, &'a Def>) {
    match item {
        Item::Def(def) => {
            sigs.insert(def.name, def);
        }
        Item::Mod(module) => module.items.iter().for_each(|i| collect_sigs(i, sigs)),
        Item::Test(_) => {}
    }
}

/// Default layout of a builtin result with no declared type.
fn scalar(kind: StackKind) -> Repr {
    match kind {
        StackKind::Byte => Repr::Byte,
        StackKind::Short => Repr::Short,
        StackKind::Int => Repr::Int,
        StackKind::Long => Repr::Long,
        StackKind::Float => Repr::Float,
        StackKind::Double => Repr::Double,
        StackKind::String => Repr::String,
        StackKind::ByteArray => Repr::ByteArray,
        StackKind::IntArray => Repr::IntArray,
        StackKind::LongArray => Repr::LongArray,
        StackKind::List => Repr::List(Box::new(Repr::Empty)),
        StackKind::Compound => Repr::Compound(Vec::new()),
    }
}

/// Stack index of the `i`-th element.
fn index(i: usize) -> i32 {
    i32::try_from(i).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests;

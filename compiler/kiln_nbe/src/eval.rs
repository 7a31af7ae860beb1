//! Evaluation, application, forcing and match reduction.

use std::rc::Rc;

use kiln_ir::{Def, Lvl, Modifiers, Name, Pattern, Term};
use kiln_stack::ensure_sufficient_stack;

use crate::{Closure, Env, FunClosure, Lazy, Normalizer, Value};

/// Outcome of matching one pattern against a value.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Matched {
    Yes,
    No,
    Stuck,
}

impl Matched {
    fn and(self, other: Matched) -> Matched {
        match (self, other) {
            (Matched::No, _) | (_, Matched::No) => Matched::No,
            (Matched::Stuck, _) | (_, Matched::Stuck) => Matched::Stuck,
            (Matched::Yes, Matched::Yes) => Matched::Yes,
        }
    }
}

fn lazies(env: &Env, terms: &[Term]) -> Vec<Lazy> {
    terms
        .iter()
        .map(|t| Lazy::deferred(env.clone(), t.clone()))
        .collect()
}

fn lazy_fields(env: &Env, fields: &[(Name, Term)]) -> Vec<(Name, Lazy)> {
    fields
        .iter()
        .map(|(k, t)| (*k, Lazy::deferred(env.clone(), t.clone())))
        .collect()
}

fn lazy(env: &Env, term: &Term) -> Lazy {
    Lazy::deferred(env.clone(), term.clone())
}

impl Normalizer {
    /// Evaluate `term` to weak-head form.
    ///
    /// Levels beyond the end of `env` evaluate to free variables.
    pub fn eval(&self, env: &Env, term: &Term) -> Value {
        ensure_sufficient_stack(|| self.eval_inner(env, term))
    }

    fn eval_inner(&self, env: &Env, term: &Term) -> Value {
        match term {
            Term::Hole => Value::Hole,
            Term::Meta(meta) => match self.solution(*meta) {
                Some(value) => value.clone(),
                None => Value::Meta(*meta),
            },
            Term::Var { name, level } => match env.get(*level) {
                Some(cell) => cell.value(self),
                None => Value::Var(*name, *level),
            },
            Term::Def(name) => self.eval_def(*name),
            Term::Let { init, body, .. } => {
                let env = env.extended([lazy(env, init)]);
                self.eval(&env, body)
            }
            Term::Match { scrutinee, clauses } => {
                let scrutinee = self.force(self.eval(env, scrutinee));
                self.eval_match(env, scrutinee, clauses.as_slice().into())
            }

            Term::UnitOf => Value::UnitOf,
            Term::BoolOf(b) => Value::BoolOf(*b),
            Term::ByteOf(n) => Value::ByteOf(*n),
            Term::ShortOf(n) => Value::ShortOf(*n),
            Term::IntOf(n) => Value::IntOf(*n),
            Term::LongOf(n) => Value::LongOf(*n),
            Term::FloatOf(n) => Value::FloatOf(*n),
            Term::DoubleOf(n) => Value::DoubleOf(*n),
            Term::StringOf(s) => Value::StringOf(s.as_str().into()),
            Term::ByteArrayOf(elems) => Value::ByteArrayOf(lazies(env, elems)),
            Term::IntArrayOf(elems) => Value::IntArrayOf(lazies(env, elems)),
            Term::LongArrayOf(elems) => Value::LongArrayOf(lazies(env, elems)),
            Term::ListOf(elems) => Value::ListOf(lazies(env, elems)),
            Term::CompoundOf(fields) => Value::CompoundOf(lazy_fields(env, fields)),
            Term::TupleOf(elems) => Value::TupleOf(lazies(env, elems)),
            Term::RefOf(elem) => Value::RefOf(lazy(env, elem)),
            Term::Refl => Value::Refl,

            Term::FunOf { params, body } => Value::FunOf(Rc::new(Closure {
                env: env.clone(),
                params: params.clone(),
                body: (**body).clone(),
            })),
            Term::Apply { func, args } => {
                let func = self.eval(env, func);
                self.apply(func, lazies(env, args))
            }

            Term::CodeOf(inner) => Value::CodeOf(lazy(env, inner)),
            Term::Splice(inner) => match self.force(self.eval(env, inner)) {
                Value::CodeOf(code) => code.value(self),
                stuck => Value::Splice(Box::new(stuck)),
            },

            Term::Or(ts) => Value::Or(lazies(env, ts)),
            Term::And(ts) => Value::And(lazies(env, ts)),
            Term::Unit => Value::Unit,
            Term::Bool => Value::Bool,
            Term::Byte => Value::Byte,
            Term::Short => Value::Short,
            Term::Int => Value::Int,
            Term::Long => Value::Long,
            Term::Float => Value::Float,
            Term::Double => Value::Double,
            Term::String => Value::String,
            Term::ByteArray => Value::ByteArray,
            Term::IntArray => Value::IntArray,
            Term::LongArray => Value::LongArray,
            Term::List(elem) => Value::List(lazy(env, elem)),
            Term::Compound(fields) => Value::Compound(lazy_fields(env, fields)),
            Term::Tuple(elems) => Value::Tuple(lazies(env, elems)),
            Term::Ref(elem) => Value::Ref(lazy(env, elem)),
            Term::Eq(l, r) => Value::Eq(lazy(env, l), lazy(env, r)),
            Term::Fun(fun) => Value::Fun(Rc::new(FunClosure {
                env: env.clone(),
                ty: (**fun).clone(),
            })),
            Term::Code(elem) => Value::Code(lazy(env, elem)),
            Term::Type => Value::Type,
        }
    }

    fn eval_def(&self, name: Name) -> Value {
        match self.lookup_def(name) {
            Some(def) if def.is_unfoldable() => unfold(self, def),
            _ => Value::Def(name, Vec::new(), self.generation()),
        }
    }

    /// Whether applications of `name` go through the folding table.
    pub fn is_builtin(&self, name: Name) -> bool {
        self.builtins.contains(name)
            || self
                .lookup_def(name)
                .is_some_and(|def| def.modifiers.contains(Modifiers::BUILTIN))
    }

    /// Apply `func` to `args`.
    pub fn apply(&self, func: Value, args: Vec<Lazy>) -> Value {
        if args.is_empty() {
            return func;
        }
        match self.force(func) {
            Value::FunOf(closure) => {
                let arity = closure.arity();
                if args.len() < arity {
                    return Value::Apply(Box::new(Value::FunOf(closure)), args);
                }
                let (now, rest) = args.split_at(arity);
                let result = closure.instantiate(self, now);
                self.apply(result, rest.to_vec())
            }
            Value::Def(name, mut spine, _) => {
                spine.extend(args);
                if self.is_builtin(name) {
                    if let Some(folded) = self.builtins.fold(self, name, &spine) {
                        return folded;
                    }
                }
                Value::Def(name, spine, self.generation())
            }
            Value::Apply(head, mut spine) => {
                spine.extend(args);
                Value::Apply(head, spine)
            }
            Value::Hole => Value::Hole,
            head => Value::Apply(Box::new(head), args),
        }
    }

    /// Resolve solved metavariables at the head of `value`, re-running any
    /// reduction they unblock.
    pub fn force(&self, value: Value) -> Value {
        ensure_sufficient_stack(|| self.force_inner(value))
    }

    fn force_inner(&self, value: Value) -> Value {
        match value {
            Value::Meta(meta) => match self.solution(meta) {
                Some(solved) => self.force(solved.clone()),
                None => Value::Meta(meta),
            },
            Value::Apply(head, args) => {
                let head = self.force(*head);
                let partial = matches!(&head, Value::FunOf(c) if c.arity() > args.len());
                if head.is_neutral() || partial {
                    Value::Apply(Box::new(head), args)
                } else {
                    self.force(self.apply(head, args))
                }
            }
            Value::Def(name, args, folded)
                if !args.is_empty() && folded != self.generation() && self.is_builtin(name) =>
            {
                // Arguments may have become literals since the last fold.
                match self.builtins.fold(self, name, &args) {
                    Some(stuck @ Value::Def(..)) => stuck,
                    Some(reduced) => self.force(reduced),
                    None => Value::Def(name, args, self.generation()),
                }
            }
            Value::Match(scrutinee, env, clauses) => {
                let scrutinee = self.force(*scrutinee);
                match self.eval_match(&env, scrutinee, clauses) {
                    stuck @ Value::Match(..) => stuck,
                    reduced => self.force(reduced),
                }
            }
            Value::Splice(inner) => match self.force(*inner) {
                Value::CodeOf(code) => self.force(code.value(self)),
                stuck => Value::Splice(Box::new(stuck)),
            },
            other => other,
        }
    }

    /// Try each clause in order against a forced scrutinee.
    ///
    /// A clause stuck on an unknown part of the scrutinee blocks the whole
    /// match. When every clause fails the result is `Hole`.
    pub(crate) fn eval_match(
        &self,
        env: &Env,
        scrutinee: Value,
        clauses: Rc<[(Pattern, Term)]>,
    ) -> Value {
        let cell = Lazy::ready(scrutinee.clone());
        for (pattern, body) in clauses.iter() {
            let mut binds = Vec::with_capacity(pattern.binder_count());
            match self.match_pattern(pattern, &cell, &mut binds) {
                Matched::Yes => return self.eval(&env.extended(binds), body),
                Matched::No => {}
                Matched::Stuck => {
                    return Value::Match(Box::new(scrutinee), env.clone(), clauses);
                }
            }
        }
        Value::Hole
    }

    /// Whether the clause patterns can decide `scrutinee` without any
    /// clause matching: `true` means every clause definitely fails.
    pub fn match_fails(&self, scrutinee: &Value, patterns: &[&Pattern]) -> bool {
        let cell = Lazy::ready(scrutinee.clone());
        patterns.iter().all(|pattern| {
            let mut binds = Vec::new();
            self.match_pattern(pattern, &cell, &mut binds) == Matched::No
        })
    }

    fn match_pattern(&self, pattern: &Pattern, cell: &Lazy, binds: &mut Vec<Lazy>) -> Matched {
        match pattern {
            Pattern::Var(_) => {
                binds.push(cell.clone());
                return Matched::Yes;
            }
            Pattern::Drop => return Matched::Yes,
            _ => {}
        }
        let value = cell.forced(self);
        if value.is_neutral() {
            return Matched::Stuck;
        }
        let literal = |same: bool| if same { Matched::Yes } else { Matched::No };
        match (pattern, &value) {
            (Pattern::UnitOf, Value::UnitOf) | (Pattern::Refl, Value::Refl) => Matched::Yes,
            (Pattern::BoolOf(p), Value::BoolOf(v)) => literal(p == v),
            (Pattern::ByteOf(p), Value::ByteOf(v)) => literal(p == v),
            (Pattern::ShortOf(p), Value::ShortOf(v)) => literal(p == v),
            (Pattern::IntOf(p), Value::IntOf(v)) => literal(p == v),
            (Pattern::LongOf(p), Value::LongOf(v)) => literal(p == v),
            (Pattern::FloatOf(p), Value::FloatOf(v)) => literal(p.to_bits() == v.to_bits()),
            (Pattern::DoubleOf(p), Value::DoubleOf(v)) => literal(p.to_bits() == v.to_bits()),
            (Pattern::StringOf(p), Value::StringOf(v)) => literal(p.as_str() == &**v),
            (Pattern::ByteArrayOf(ps), Value::ByteArrayOf(vs))
            | (Pattern::IntArrayOf(ps), Value::IntArrayOf(vs))
            | (Pattern::LongArrayOf(ps), Value::LongArrayOf(vs))
            | (Pattern::ListOf(ps), Value::ListOf(vs))
            | (Pattern::TupleOf(ps), Value::TupleOf(vs)) => {
                if ps.len() != vs.len() {
                    return Matched::No;
                }
                ps.iter()
                    .zip(vs)
                    .fold(Matched::Yes, |acc, (p, v)| {
                        acc.and(self.match_pattern(p, v, binds))
                    })
            }
            (Pattern::CompoundOf(ps), Value::CompoundOf(vs)) => {
                ps.iter().fold(Matched::Yes, |acc, (key, p)| {
                    match vs.iter().find(|(k, _)| k == key) {
                        Some((_, v)) => acc.and(self.match_pattern(p, v, binds)),
                        None => Matched::No,
                    }
                })
            }
            (Pattern::RefOf(p), Value::RefOf(v)) => self.match_pattern(p, v, binds),
            _ => Matched::No,
        }
    }
}

fn unfold(norm: &Normalizer, def: &Def) -> Value {
    let Some(body) = &def.body else {
        return Value::Def(def.name, Vec::new(), norm.generation());
    };
    if def.params.is_empty() {
        return norm.eval(&Env::new(), body);
    }
    Value::FunOf(Rc::new(Closure {
        env: Env::new(),
        params: def
            .params
            .iter()
            .map(|p| kiln_ir::Binder {
                name: p.name,
                relevant: p.relevant,
                ty: p.ty.clone(),
            })
            .collect(),
        body: body.clone(),
    }))
}

/// Free variables for levels `from..from + names.len()`.
pub(crate) fn fresh_vars(from: Lvl, names: impl IntoIterator<Item = Name>) -> Vec<Lazy> {
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Lazy::ready(Value::Var(name, from.plus(i))))
        .collect()
}

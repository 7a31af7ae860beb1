//! Builtin constant folding.
//!
//! Applying a builtin definition consults its fold rule first. A rule
//! returns `Some` when it can simplify, including when it only reorders
//! commutative operands, and `None` to leave the application stuck as is.

use std::cmp::Ordering;

use kiln_ir::arith::{floor_div, floor_mod};
use kiln_ir::{Lvl, Name};
use rustc_hash::FxHashMap;

use crate::{Lazy, Normalizer, Value};

/// Simplification rule for one builtin: `(normalizer, name, arguments)`.
pub type FoldRule = fn(&Normalizer, Name, &[Lazy]) -> Option<Value>;

/// Fold rules keyed by qualified builtin name.
#[derive(Clone)]
pub struct Builtins {
    rules: FxHashMap<Name, FoldRule>,
}

impl Builtins {
    pub fn empty() -> Self {
        Builtins {
            rules: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, name: &str, rule: FoldRule) {
        self.rules.insert(Name::new(name), rule);
    }

    pub fn contains(&self, name: Name) -> bool {
        self.rules.contains_key(&name)
    }

    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.rules.keys().copied()
    }

    pub(crate) fn fold(&self, norm: &Normalizer, name: Name, args: &[Lazy]) -> Option<Value> {
        let rule = self.rules.get(&name)?;
        rule(norm, name, args)
    }
}

impl Default for Builtins {
    /// The integer builtins.
    fn default() -> Self {
        let mut table = Builtins::empty();
        table.insert("int/add", fold_add);
        table.insert("int/sub", fold_sub);
        table.insert("int/mul", fold_mul);
        table.insert("int/div", fold_div);
        table.insert("int/mod", fold_mod);
        table.insert("int/min", |n, _, a| fold_literals(n, a, |x, y| Some(Value::IntOf(x.min(y)))));
        table.insert("int/max", |n, _, a| fold_literals(n, a, |x, y| Some(Value::IntOf(x.max(y)))));
        table.insert("int/eq", |n, _, a| fold_literals(n, a, |x, y| Some(Value::BoolOf(x == y))));
        table.insert("int/lt", |n, _, a| fold_literals(n, a, |x, y| Some(Value::BoolOf(x < y))));
        table
    }
}

impl std::fmt::Debug for Builtins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.rules.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

fn operands(norm: &Normalizer, args: &[Lazy]) -> Option<(Value, Value)> {
    match args {
        [a, b] => Some((a.forced(norm), b.forced(norm))),
        _ => None,
    }
}

fn fold_literals(
    norm: &Normalizer,
    args: &[Lazy],
    op: impl FnOnce(i32, i32) -> Option<Value>,
) -> Option<Value> {
    let (a, b) = operands(norm, args)?;
    op(a.as_int()?, b.as_int()?)
}

/// Level operands are quoted at when comparing them; far above any real
/// context so binders inside operands never collide with free variables.
const ORDER_LEVEL: Lvl = Lvl::new(1 << 24);

fn operand_rank(value: &Value) -> u8 {
    match value {
        Value::Var(..) => 2,
        v if v.is_neutral() => 1,
        _ => 0,
    }
}

/// Order of the heads alone; `Equal` when the heads do not decide.
fn head_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Def(x, ..), Value::Def(y, ..)) => x.cmp(y),
        (Value::Var(_, l), Value::Var(_, m)) => l.cmp(m),
        _ => Ordering::Equal,
    }
}

/// Total order on commutative operands: literals first, then other
/// neutrals, then variables. Ties are broken by the heads, and only then
/// by the quoted terms.
fn operand_order(norm: &Normalizer, a: &Value, b: &Value) -> Ordering {
    operand_rank(a)
        .cmp(&operand_rank(b))
        .then_with(|| head_order(a, b))
        .then_with(|| {
            let (qa, qb) = (norm.quote(ORDER_LEVEL, a), norm.quote(ORDER_LEVEL, b));
            qa.total_cmp(&qb)
        })
}

fn canonical(norm: &Normalizer, name: Name, a: Value, b: Value) -> Value {
    let (first, second) = match operand_order(norm, &a, &b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    Value::Def(
        name,
        vec![Lazy::ready(first), Lazy::ready(second)],
        norm.generation(),
    )
}

fn same(norm: &Normalizer, a: &Value, b: &Value) -> bool {
    operand_rank(a) == operand_rank(b)
        && head_order(a, b) == Ordering::Equal
        && norm.quote(ORDER_LEVEL, a) == norm.quote(ORDER_LEVEL, b)
}

fn fold_add(norm: &Normalizer, name: Name, args: &[Lazy]) -> Option<Value> {
    let (a, b) = operands(norm, args)?;
    Some(match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => Value::IntOf(x.wrapping_add(y)),
        (_, Some(0)) => a,
        (Some(0), _) => b,
        _ => canonical(norm, name, a, b),
    })
}

fn fold_mul(norm: &Normalizer, name: Name, args: &[Lazy]) -> Option<Value> {
    let (a, b) = operands(norm, args)?;
    Some(match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => Value::IntOf(x.wrapping_mul(y)),
        (_, Some(0)) | (Some(0), _) => Value::IntOf(0),
        (_, Some(1)) => a,
        (Some(1), _) => b,
        _ => canonical(norm, name, a, b),
    })
}

fn fold_sub(norm: &Normalizer, _: Name, args: &[Lazy]) -> Option<Value> {
    let (a, b) = operands(norm, args)?;
    match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => Some(Value::IntOf(x.wrapping_sub(y))),
        (_, Some(0)) => Some(a),
        _ if same(norm, &a, &b) => Some(Value::IntOf(0)),
        _ => None,
    }
}

fn fold_div(norm: &Normalizer, _: Name, args: &[Lazy]) -> Option<Value> {
    let (a, b) = operands(norm, args)?;
    match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => floor_div(x, y).map(Value::IntOf),
        (_, Some(1)) => Some(a),
        _ => None,
    }
}

fn fold_mod(norm: &Normalizer, _: Name, args: &[Lazy]) -> Option<Value> {
    fold_literals(norm, args, |x, y| floor_mod(x, y).map(Value::IntOf))
}

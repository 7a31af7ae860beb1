//! Runtime representations of erased types.

use std::fmt;

use kiln_ir::{Name, Term};

use crate::PackError;

/// The twelve typed stacks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StackKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    ByteArray,
    IntArray,
    LongArray,
    List,
    Compound,
}

impl StackKind {
    pub const ALL: [StackKind; 12] = [
        StackKind::Byte,
        StackKind::Short,
        StackKind::Int,
        StackKind::Long,
        StackKind::Float,
        StackKind::Double,
        StackKind::String,
        StackKind::ByteArray,
        StackKind::IntArray,
        StackKind::LongArray,
        StackKind::List,
        StackKind::Compound,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StackKind::Byte => "byte",
            StackKind::Short => "short",
            StackKind::Int => "int",
            StackKind::Long => "long",
            StackKind::Float => "float",
            StackKind::Double => "double",
            StackKind::String => "string",
            StackKind::ByteArray => "byte_array",
            StackKind::IntArray => "int_array",
            StackKind::LongArray => "long_array",
            StackKind::List => "list",
            StackKind::Compound => "compound",
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a value of some type is laid out in the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Repr {
    Unit,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    ByteArray,
    IntArray,
    LongArray,
    List(Box<Repr>),
    /// Fields in name order.
    Compound(Vec<(Name, Repr)>),
    /// A compound keyed `"0"`, `"1"`, ...
    Tuple(Vec<Repr>),
    /// A one-element list.
    Ref(Box<Repr>),
    /// A closure tag. Erased parameters are `None`.
    Fun {
        params: Vec<Option<Repr>>,
        result: Box<Repr>,
    },
    /// Element type of the empty list; never materialized.
    Empty,
}

impl Repr {
    /// Erase a normalized, closed type.
    pub fn of_type(ty: &Term) -> Result<Repr, PackError> {
        kiln_stack::ensure_sufficient_stack(|| {
            Ok(match ty {
                Term::Unit | Term::Eq(..) => Repr::Unit,
                Term::Bool => Repr::Bool,
                Term::Byte => Repr::Byte,
                Term::Short => Repr::Short,
                Term::Int => Repr::Int,
                Term::Long => Repr::Long,
                Term::Float => Repr::Float,
                Term::Double => Repr::Double,
                Term::String => Repr::String,
                Term::ByteArray => Repr::ByteArray,
                Term::IntArray => Repr::IntArray,
                Term::LongArray => Repr::LongArray,
                Term::List(elem) => Repr::List(Box::new(Repr::of_type(elem)?)),
                Term::Compound(fields) => Repr::Compound(
                    fields
                        .iter()
                        .map(|(k, t)| Ok((*k, Repr::of_type(t)?)))
                        .collect::<Result<_, PackError>>()?,
                ),
                Term::Tuple(elems) => Repr::Tuple(
                    elems
                        .iter()
                        .map(Repr::of_type)
                        .collect::<Result<_, _>>()?,
                ),
                Term::Ref(elem) => Repr::Ref(Box::new(Repr::of_type(elem)?)),
                Term::Fun(fun) => Repr::Fun {
                    params: fun
                        .params
                        .iter()
                        .map(|p| p.relevant.then(|| Repr::of_type(&p.ty)).transpose())
                        .collect::<Result<_, _>>()?,
                    result: Box::new(Repr::of_type(&fun.result)?),
                },
                Term::Or(members) | Term::And(members) => Repr::of_members(ty, members)?,
                _ => return Err(PackError::Unerasable { ty: ty.clone() }),
            })
        })
    }

    /// A union or intersection erases to its members' common layout.
    fn of_members(ty: &Term, members: &[Term]) -> Result<Repr, PackError> {
        let mut reprs = members
            .iter()
            .map(Repr::of_type)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|r| *r != Repr::Empty);
        let Some(first) = reprs.next() else {
            return Ok(Repr::Empty);
        };
        if reprs.all(|r| r.stack() == first.stack()) {
            Ok(first)
        } else {
            Err(PackError::Unerasable { ty: ty.clone() })
        }
    }

    /// Layout of a literal built only from constant formers.
    pub fn of_literal(term: &Term) -> Option<Repr> {
        Some(match term {
            Term::UnitOf | Term::Refl => Repr::Unit,
            Term::BoolOf(_) => Repr::Bool,
            Term::ByteOf(_) => Repr::Byte,
            Term::ShortOf(_) => Repr::Short,
            Term::IntOf(_) => Repr::Int,
            Term::LongOf(_) => Repr::Long,
            Term::FloatOf(_) => Repr::Float,
            Term::DoubleOf(_) => Repr::Double,
            Term::StringOf(_) => Repr::String,
            Term::ByteArrayOf(_) => Repr::ByteArray,
            Term::IntArrayOf(_) => Repr::IntArray,
            Term::LongArrayOf(_) => Repr::LongArray,
            Term::ListOf(elems) => Repr::List(Box::new(match elems.first() {
                Some(elem) => Repr::of_literal(elem)?,
                None => Repr::Empty,
            })),
            Term::CompoundOf(fields) => Repr::Compound(
                fields
                    .iter()
                    .map(|(k, v)| Some((*k, Repr::of_literal(v)?)))
                    .collect::<Option<_>>()?,
            ),
            Term::TupleOf(elems) => {
                Repr::Tuple(elems.iter().map(Repr::of_literal).collect::<Option<_>>()?)
            }
            Term::RefOf(elem) => Repr::Ref(Box::new(Repr::of_literal(elem)?)),
            _ => return None,
        })
    }

    pub fn stack(&self) -> StackKind {
        match self {
            Repr::Unit | Repr::Bool | Repr::Byte | Repr::Empty => StackKind::Byte,
            Repr::Short => StackKind::Short,
            Repr::Int | Repr::Fun { .. } => StackKind::Int,
            Repr::Long => StackKind::Long,
            Repr::Float => StackKind::Float,
            Repr::Double => StackKind::Double,
            Repr::String => StackKind::String,
            Repr::ByteArray => StackKind::ByteArray,
            Repr::IntArray => StackKind::IntArray,
            Repr::LongArray => StackKind::LongArray,
            Repr::List(_) | Repr::Ref(_) => StackKind::List,
            Repr::Compound(_) | Repr::Tuple(_) => StackKind::Compound,
        }
    }

    /// Element layout of arrays, lists and references.
    pub fn element(&self) -> Option<Repr> {
        match self {
            Repr::ByteArray => Some(Repr::Byte),
            Repr::IntArray => Some(Repr::Int),
            Repr::LongArray => Some(Repr::Long),
            Repr::List(elem) | Repr::Ref(elem) => Some((**elem).clone()),
            _ => None,
        }
    }

    pub fn field(&self, key: Name) -> Option<&Repr> {
        match self {
            Repr::Compound(fields) => fields.iter().find(|(k, _)| *k == key).map(|(_, r)| r),
            _ => None,
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::Unit => f.write_str("unit"),
            Repr::Bool => f.write_str("bool"),
            Repr::Byte => f.write_str("byte"),
            Repr::Short => f.write_str("short"),
            Repr::Int => f.write_str("int"),
            Repr::Long => f.write_str("long"),
            Repr::Float => f.write_str("float"),
            Repr::Double => f.write_str("double"),
            Repr::String => f.write_str("string"),
            Repr::ByteArray => f.write_str("byte_array"),
            Repr::IntArray => f.write_str("int_array"),
            Repr::LongArray => f.write_str("long_array"),
            Repr::List(elem) => write!(f, "list<{elem}>"),
            Repr::Compound(fields) => {
                f.write_str("{")?;
                for (i, (k, r)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {r}")?;
                }
                f.write_str("}")
            }
            Repr::Tuple(elems) => {
                f.write_str("(")?;
                for (i, r) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{r}")?;
                }
                f.write_str(")")
            }
            Repr::Ref(elem) => write!(f, "ref<{elem}>"),
            Repr::Fun { params, result } => {
                f.write_str("fun(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match p {
                        Some(r) => write!(f, "{r}")?,
                        None => f.write_str("_")?,
                    }
                }
                write!(f, ") -> {result}")
            }
            Repr::Empty => f.write_str("empty"),
        }
    }
}

//! Tagged tree values held by the target store.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use kiln_ir::Term;

/// A stored value.
///
/// Lists are homogeneous on the target; nothing here enforces it, the
/// packer only ever builds homogeneous lists.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Nbt {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<Nbt>),
    Compound(BTreeMap<String, Nbt>),
}

impl Nbt {
    pub fn compound() -> Nbt {
        Nbt::Compound(BTreeMap::new())
    }

    /// Encode a literal term built only from constant formers.
    ///
    /// Unit, booleans and `Refl` are bytes; tuples are compounds keyed by
    /// position; a reference is a one-element list.
    pub fn from_literal(term: &Term) -> Option<Nbt> {
        Some(match term {
            Term::UnitOf | Term::Refl => Nbt::Byte(0),
            Term::BoolOf(b) => Nbt::Byte(i8::from(*b)),
            Term::ByteOf(n) => Nbt::Byte(*n),
            Term::ShortOf(n) => Nbt::Short(*n),
            Term::IntOf(n) => Nbt::Int(*n),
            Term::LongOf(n) => Nbt::Long(*n),
            Term::FloatOf(n) => Nbt::Float(*n),
            Term::DoubleOf(n) => Nbt::Double(*n),
            Term::StringOf(s) => Nbt::String(s.clone()),
            Term::ByteArrayOf(elems) => Nbt::ByteArray(
                elems
                    .iter()
                    .map(|e| match e {
                        Term::ByteOf(n) => Some(*n),
                        _ => None,
                    })
                    .collect::<Option<_>>()?,
            ),
            Term::IntArrayOf(elems) => Nbt::IntArray(
                elems
                    .iter()
                    .map(|e| match e {
                        Term::IntOf(n) => Some(*n),
                        _ => None,
                    })
                    .collect::<Option<_>>()?,
            ),
            Term::LongArrayOf(elems) => Nbt::LongArray(
                elems
                    .iter()
                    .map(|e| match e {
                        Term::LongOf(n) => Some(*n),
                        _ => None,
                    })
                    .collect::<Option<_>>()?,
            ),
            Term::ListOf(elems) => {
                Nbt::List(elems.iter().map(Nbt::from_literal).collect::<Option<_>>()?)
            }
            Term::CompoundOf(fields) => Nbt::Compound(
                fields
                    .iter()
                    .map(|(k, v)| Some((k.as_str().to_owned(), Nbt::from_literal(v)?)))
                    .collect::<Option<_>>()?,
            ),
            Term::TupleOf(elems) => Nbt::Compound(
                elems
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Some((i.to_string(), Nbt::from_literal(v)?)))
                    .collect::<Option<_>>()?,
            ),
            Term::RefOf(elem) => Nbt::List(vec![Nbt::from_literal(elem)?]),
            _ => return None,
        })
    }

    /// Numeric leaf as a register value: integers wrap, floats floor.
    pub fn as_register(&self) -> Option<i32> {
        #[allow(clippy::cast_possible_truncation)]
        Some(match self {
            Nbt::Byte(n) => i32::from(*n),
            Nbt::Short(n) => i32::from(*n),
            Nbt::Int(n) => *n,
            Nbt::Long(n) => *n as i32,
            Nbt::Float(n) => n.floor() as i32,
            Nbt::Double(n) => n.floor() as i32,
            _ => return None,
        })
    }

    /// The same numeric kind holding `value`.
    pub fn with_register(&self, value: i32) -> Option<Nbt> {
        #[allow(clippy::cast_possible_truncation)]
        Some(match self {
            Nbt::Byte(_) => Nbt::Byte(value as i8),
            Nbt::Short(_) => Nbt::Short(value as i16),
            Nbt::Int(_) => Nbt::Int(value),
            Nbt::Long(_) => Nbt::Long(i64::from(value)),
            Nbt::Float(_) => Nbt::Float(value as f32),
            Nbt::Double(_) => Nbt::Double(f64::from(value)),
            _ => return None,
        })
    }

    /// Structural containment: every key of a compound `pattern` is present
    /// in `self` with a contained value; anything else compares equal.
    pub fn contains(&self, pattern: &Nbt) -> bool {
        match (self, pattern) {
            (Nbt::Compound(have), Nbt::Compound(want)) => want
                .iter()
                .all(|(k, v)| have.get(k).is_some_and(|h| h.contains(v))),
            _ => self == pattern,
        }
    }
}

/// Keys that need no quoting in a path or compound literal.
pub(crate) fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'))
}

pub(crate) fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    if is_bare_key(key) {
        f.write_str(key)
    } else {
        write_quoted(f, key)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

fn write_seq<T>(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    items: &[T],
    mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    f.write_char('[')?;
    f.write_str(prefix)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    f.write_char(']')
}

impl fmt::Display for Nbt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nbt::Byte(n) => write!(f, "{n}b"),
            Nbt::Short(n) => write!(f, "{n}s"),
            Nbt::Int(n) => write!(f, "{n}"),
            Nbt::Long(n) => write!(f, "{n}L"),
            Nbt::Float(n) => write!(f, "{n}f"),
            Nbt::Double(n) => write!(f, "{n}d"),
            Nbt::String(s) => write_quoted(f, s),
            Nbt::ByteArray(elems) => write_seq(f, "B; ", elems, |f, n| write!(f, "{n}b")),
            Nbt::IntArray(elems) => write_seq(f, "I; ", elems, |f, n| write!(f, "{n}")),
            Nbt::LongArray(elems) => write_seq(f, "L; ", elems, |f, n| write!(f, "{n}L")),
            Nbt::List(elems) => write_seq(f, "", elems, |f, e| write!(f, "{e}")),
            Nbt::Compound(fields) => {
                f.write_char('{')?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_key(f, k)?;
                    write!(f, ": {v}")?;
                }
                f.write_char('}')
            }
        }
    }
}

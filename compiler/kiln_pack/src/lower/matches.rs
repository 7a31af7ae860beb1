//! Match compilation into clause units.

use kiln_ir::{Name, Pattern, Term};

use super::{index, Packer};
use crate::{Condition, Instr, Nbt, PackError, Path, Register, Repr, Source, UnitName};

fn clear_flag() -> Instr {
    Instr::Assign {
        register: Register::R1,
        value: 0,
    }
}

fn flag_is(value: i32) -> Condition {
    Condition::Equals {
        register: Register::R1,
        value,
    }
}

impl Packer<'_> {
    pub(super) fn lower_match(
        &mut self,
        scrutinee: &Term,
        clauses: &[(Pattern, Term)],
    ) -> Result<Repr, PackError> {
        let scrutinee_repr = self.lower(scrutinee)?;
        let Some(last) = clauses.len().checked_sub(1) else {
            // Nothing can inhabit the scrutinee's type; keep the stack shape.
            let top = self.frame.mirror.top();
            self.drop_slot(top);
            self.push_value(Nbt::Byte(0), Repr::Empty);
            return Ok(Repr::Empty);
        };

        let id = self.next_match();
        let root = self.frame.root.clone();
        let mirror = self.frame.mirror.clone();
        let depth = self.frame.depth;
        let clause_unit = |i: usize| root.child(&format!("match.{id}.{i}"));

        self.emit(Instr::Invoke {
            unit: clause_unit(0),
        });
        let mut result = None;
        for (i, (pattern, body)) in clauses.iter().enumerate() {
            let unit = clause_unit(i);
            let repr = if i == last {
                self.in_unit(unit, root.clone(), mirror.clone(), depth, |p| {
                    p.clause_body(pattern, &scrutinee_repr, body)
                })?
            } else {
                let body_unit = root.child(&format!("match.{id}.{i}.body"));
                let repr = self.in_unit(body_unit.clone(), root.clone(), mirror.clone(), depth, |p| {
                    p.clause_body(pattern, &scrutinee_repr, body)
                })?;
                let next = clause_unit(i + 1);
                self.in_unit(unit, root.clone(), mirror.clone(), depth, |p| {
                    p.clause_tests(pattern, &scrutinee_repr, body_unit, next)
                })?;
                repr
            };
            result.get_or_insert(repr);
        }
        let result = result.unwrap_or(Repr::Empty);
        Ok(self.consume(1, result))
    }

    fn clause_tests(
        &mut self,
        pattern: &Pattern,
        repr: &Repr,
        body: UnitName,
        next: UnitName,
    ) -> Result<(), PackError> {
        self.emit(Instr::Assign {
            register: Register::R1,
            value: 1,
        });
        let path = self.frame.mirror.path(self.frame.mirror.top());
        self.pattern_tests(pattern, repr, &path)?;
        self.emit(Instr::when(flag_is(1), Instr::Invoke { unit: body }));
        self.emit(Instr::when(flag_is(0), Instr::Invoke { unit: next }));
        Ok(())
    }

    /// One test per literal leaf; a failing test clears `R1`.
    fn pattern_tests(&mut self, pattern: &Pattern, repr: &Repr, path: &Path) -> Result<(), PackError> {
        let shape = || PackError::PatternShape { repr: repr.clone() };
        match pattern {
            Pattern::Var(_) | Pattern::Drop | Pattern::UnitOf | Pattern::Refl => {}
            Pattern::BoolOf(b) => self.test_register(path, i32::from(*b)),
            Pattern::ByteOf(n) => self.test_register(path, i32::from(*n)),
            Pattern::ShortOf(n) => self.test_register(path, i32::from(*n)),
            Pattern::IntOf(n) => self.test_register(path, *n),
            Pattern::LongOf(n) => self.test_contains(path, Nbt::Long(*n)),
            Pattern::FloatOf(n) => self.test_contains(path, Nbt::Float(*n)),
            Pattern::DoubleOf(n) => self.test_contains(path, Nbt::Double(*n)),
            Pattern::StringOf(s) => self.test_contains(path, Nbt::String(s.clone())),
            Pattern::ByteArrayOf(elems)
            | Pattern::IntArrayOf(elems)
            | Pattern::LongArrayOf(elems)
            | Pattern::ListOf(elems) => {
                let elem = repr.element().ok_or_else(shape)?;
                self.test_length(path, elems.len());
                for (i, p) in elems.iter().enumerate() {
                    self.pattern_tests(p, &elem, &path.clone().index(index(i)))?;
                }
            }
            Pattern::CompoundOf(fields) => {
                for (key, p) in fields {
                    let field = repr.field(*key).ok_or_else(shape)?;
                    self.pattern_tests(p, field, &path.clone().key(key.as_str()))?;
                }
            }
            Pattern::TupleOf(elems) => {
                let Repr::Tuple(reprs) = repr else {
                    return Err(shape());
                };
                for (i, p) in elems.iter().enumerate() {
                    let elem = reprs.get(i).ok_or_else(shape)?;
                    self.pattern_tests(p, elem, &path.clone().key(i.to_string()))?;
                }
            }
            Pattern::RefOf(p) => {
                let elem = repr.element().ok_or_else(shape)?;
                self.pattern_tests(p, &elem, &path.clone().index(0))?;
            }
        }
        Ok(())
    }

    fn test_register(&mut self, path: &Path, value: i32) {
        self.emit(Instr::Get {
            register: Register::R0,
            path: path.clone(),
        });
        self.emit(Instr::unless(
            Condition::Equals {
                register: Register::R0,
                value,
            },
            clear_flag(),
        ));
    }

    fn test_contains(&mut self, path: &Path, value: Nbt) {
        self.emit(Instr::unless(
            Condition::Matches {
                path: path.clone(),
                value,
            },
            clear_flag(),
        ));
    }

    /// Exactly `len` elements: the last one exists and the one after it
    /// does not.
    fn test_length(&mut self, path: &Path, len: usize) {
        if let Some(last) = len.checked_sub(1) {
            self.emit(Instr::unless(
                Condition::Exists {
                    path: path.clone().index(index(last)),
                },
                clear_flag(),
            ));
        }
        self.emit(Instr::when(
            Condition::Exists {
                path: path.clone().index(index(len)),
            },
            clear_flag(),
        ));
    }

    fn clause_body(&mut self, pattern: &Pattern, repr: &Repr, body: &Term) -> Result<Repr, PackError> {
        let scrutinee = self.frame.mirror.top();
        let base = self.frame.depth;
        let mut vars = Vec::new();
        pattern_vars(pattern, repr, &Path::root(), &mut vars)?;
        let names: Vec<Name> = vars.iter().map(|(name, _, _)| *name).collect();
        for (i, (_, sub, var_repr)) in vars.into_iter().enumerate() {
            let from = self.frame.mirror.path(scrutinee).join(&sub);
            self.emit(Instr::Append {
                path: Path::stack(var_repr.stack()),
                source: Source::Path(from),
            });
            self.frame.mirror.push(var_repr, Some(base.plus(i)));
        }
        self.drop_slot(scrutinee);

        self.frame.depth = base.plus(names.len());
        let out = self.lower(body)?;
        self.frame.depth = base;

        for (i, name) in names.iter().enumerate().rev() {
            let slot = self
                .frame
                .mirror
                .find(base.plus(i))
                .ok_or(PackError::Unbound { name: *name })?;
            self.drop_slot(slot);
        }
        self.emit(Instr::Assign {
            register: Register::R1,
            value: 1,
        });
        Ok(out)
    }
}

/// Pattern variables in level order, with their path inside the
/// scrutinee and their layout.
fn pattern_vars(
    pattern: &Pattern,
    repr: &Repr,
    path: &Path,
    out: &mut Vec<(Name, Path, Repr)>,
) -> Result<(), PackError> {
    let shape = || PackError::PatternShape { repr: repr.clone() };
    match pattern {
        Pattern::Var(name) => out.push((*name, path.clone(), repr.clone())),
        Pattern::ByteArrayOf(elems)
        | Pattern::IntArrayOf(elems)
        | Pattern::LongArrayOf(elems)
        | Pattern::ListOf(elems) => {
            let elem = repr.element().ok_or_else(shape)?;
            for (i, p) in elems.iter().enumerate() {
                pattern_vars(p, &elem, &path.clone().index(index(i)), out)?;
            }
        }
        Pattern::CompoundOf(fields) => {
            for (key, p) in fields {
                let field = repr.field(*key).ok_or_else(shape)?;
                pattern_vars(p, field, &path.clone().key(key.as_str()), out)?;
            }
        }
        Pattern::TupleOf(elems) => {
            let Repr::Tuple(reprs) = repr else {
                return Err(shape());
            };
            for (i, p) in elems.iter().enumerate() {
                let elem = reprs.get(i).ok_or_else(shape)?;
                pattern_vars(p, elem, &path.clone().key(i.to_string()), out)?;
            }
        }
        Pattern::RefOf(p) => {
            let elem = repr.element().ok_or_else(shape)?;
            pattern_vars(p, &elem, &path.clone().index(0), out)?;
        }
        _ => {}
    }
    Ok(())
}

use std::fmt;

use kiln_ir::{EffectSet, Id, MetaId, Name, Term};

use crate::ErrorCode;

/// A diagnostic record.
///
/// Data, not control flow: the elaborator and zonker push these and keep
/// going. Types are quoted at the depth of the offending node.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    VarNotFound {
        name: Name,
        id: Id,
    },
    DefNotFound {
        name: Name,
        id: Id,
    },
    TermMismatch {
        expected: Term,
        actual: Term,
        id: Id,
    },
    ArityMismatch {
        expected: usize,
        actual: usize,
        id: Id,
    },
    EffectMismatch {
        permitted: EffectSet,
        required: EffectSet,
        id: Id,
    },
    StageMismatch {
        expected: u8,
        actual: u8,
        id: Id,
    },
    PhaseMismatch {
        name: Name,
        id: Id,
    },
    RelevanceMismatch {
        name: Name,
        id: Id,
    },
    PolyRepr {
        ty: Term,
        id: Id,
    },
    MatchFailure {
        id: Id,
    },
    UnsolvedMeta {
        meta: MetaId,
    },
}

impl Diagnostic {
    pub fn code(&self) -> ErrorCode {
        match self {
            Diagnostic::VarNotFound { .. } => ErrorCode::E2001,
            Diagnostic::DefNotFound { .. } => ErrorCode::E2002,
            Diagnostic::TermMismatch { .. } => ErrorCode::E2003,
            Diagnostic::ArityMismatch { .. } => ErrorCode::E2004,
            Diagnostic::EffectMismatch { .. } => ErrorCode::E2005,
            Diagnostic::StageMismatch { .. } => ErrorCode::E2006,
            Diagnostic::PhaseMismatch { .. } => ErrorCode::E2007,
            Diagnostic::RelevanceMismatch { .. } => ErrorCode::E2008,
            Diagnostic::PolyRepr { .. } => ErrorCode::E2009,
            Diagnostic::MatchFailure { .. } => ErrorCode::E2010,
            Diagnostic::UnsolvedMeta { .. } => ErrorCode::E3001,
        }
    }

    /// The offending node, if the diagnostic has one.
    pub fn id(&self) -> Option<Id> {
        match self {
            Diagnostic::VarNotFound { id, .. }
            | Diagnostic::DefNotFound { id, .. }
            | Diagnostic::TermMismatch { id, .. }
            | Diagnostic::ArityMismatch { id, .. }
            | Diagnostic::EffectMismatch { id, .. }
            | Diagnostic::StageMismatch { id, .. }
            | Diagnostic::PhaseMismatch { id, .. }
            | Diagnostic::RelevanceMismatch { id, .. }
            | Diagnostic::PolyRepr { id, .. }
            | Diagnostic::MatchFailure { id } => Some(*id),
            Diagnostic::UnsolvedMeta { .. } => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        !self.code().is_recoverable()
    }

    /// Primary message, without code or location.
    pub fn message(&self) -> String {
        match self {
            Diagnostic::VarNotFound { name, .. } => format!("cannot find `{name}` in this scope"),
            Diagnostic::DefNotFound { name, .. } => format!("no definition named `{name}`"),
            Diagnostic::TermMismatch {
                expected, actual, ..
            } => format!("type mismatch: expected `{expected}`, found `{actual}`"),
            Diagnostic::ArityMismatch {
                expected, actual, ..
            } => {
                let plural = if *expected == 1 { "" } else { "s" };
                format!("expected {expected} argument{plural}, found {actual}")
            }
            Diagnostic::EffectMismatch {
                permitted,
                required,
                ..
            } => format!("call requires effects {required} but only {permitted} are permitted"),
            Diagnostic::StageMismatch {
                expected, actual, ..
            } => format!("used at stage {actual}, but stage {expected} is required"),
            Diagnostic::PhaseMismatch { name, .. } => {
                format!("runtime definition `{name}` used outside a quotation")
            }
            Diagnostic::RelevanceMismatch { name, .. } => {
                format!("erased binder `{name}` used in a runtime position")
            }
            Diagnostic::PolyRepr { ty, .. } => {
                format!("runtime representation of `{ty}` is not known")
            }
            Diagnostic::MatchFailure { .. } => "no clause matches this value".to_owned(),
            Diagnostic::UnsolvedMeta { meta } => format!("cannot infer the value of `{meta}`"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code(), self.message())?;
        if let Some(id) = self.id() {
            write!(f, " (at {id})")?;
        }
        Ok(())
    }
}

/// Accumulated diagnostics of one unit.
///
/// Order carries no meaning; callers sort by [`Diagnostic::id`] when they
/// need a stable report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_fatal(&self) -> bool {
        self.items.iter().any(Diagnostic::is_fatal)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics sorted by node id, fatal ones last.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut out = self.items.clone();
        out.sort_by_key(|d| (d.id().is_none(), d.id(), d.code()));
        out
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Diagnostics {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

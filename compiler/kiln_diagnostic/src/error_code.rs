use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where the first digit gives the class:
/// - E2xxx: Elaboration errors (recoverable)
/// - E3xxx: Zonking errors (fatal to the unit)
/// - E9xxx: Internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub enum ErrorCode {
    // Elaboration Errors (E2xxx)
    /// Unbound local or definition name
    E2001,
    /// Unresolved qualified definition path
    E2002,
    /// Type mismatch
    E2003,
    /// Wrong number of arguments
    E2004,
    /// Callee requires effects the caller does not permit
    E2005,
    /// Term used at the wrong stage
    E2006,
    /// Object-level definition used outside every quotation
    E2007,
    /// Irrelevant binder used in a relevant position
    E2008,
    /// Runtime representation depends on an erased type
    E2009,
    /// Known scrutinee matches no clause
    E2010,

    // Zonking Errors (E3xxx)
    /// Metavariable left unsolved
    E3001,

    // Internal Errors (E9xxx)
    /// Staging construct survived the stager
    E9001,
    /// Defunctionalizer invariant violated
    E9002,
    /// Packer invariant violated
    E9003,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2010 => "E2010",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
            ErrorCode::E9003 => "E9003",
        }
    }

    /// Recoverable: elaboration continues and later diagnostics still
    /// get reported.
    pub fn is_recoverable(&self) -> bool {
        self.as_str().starts_with("E2")
    }

    pub fn is_internal(&self) -> bool {
        self.as_str().starts_with("E9")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Diagnostics for the Kiln compiler.
//!
//! - Error codes for searchability ([`ErrorCode`])
//! - Tagged records carrying the offending node [`Id`](kiln_ir::Id) and the
//!   quoted terms involved ([`Diagnostic`])
//! - An unordered collection that never drops entries ([`Diagnostics`])
//!
//! Recoverable diagnostics (`E2xxx`) are produced by the elaborator.
//! `UnsolvedMeta` (`E3001`) comes from the zonker and stops the unit's
//! pipeline. Internal errors (`E9xxx`) are typed errors owned by the stage
//! that raises them; the codes here let drivers report them uniformly.

mod diagnostic;
mod error_code;

pub use diagnostic::{Diagnostic, Diagnostics};
pub use error_code::ErrorCode;

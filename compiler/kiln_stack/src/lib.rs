//! Stack growth for deeply nested terms.
//!
//! Elaboration, evaluation, zonking, staging, defunctionalization and
//! lowering all recurse over term structure. Generated or spliced code can
//! nest far deeper than hand-written code, so each recursive entry point
//! runs its body through [`ensure_sufficient_stack`].
//!
//! On native targets a new segment is allocated with `stacker` whenever
//! less than [`RED_ZONE`] bytes remain. On `wasm32` the closure is called
//! directly.

/// Remaining stack below which a new segment is allocated.
pub const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
pub const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if it is nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

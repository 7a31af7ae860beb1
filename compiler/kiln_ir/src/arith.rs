//! Integer semantics of the target's 32-bit counters.
//!
//! Constant folding and the reference machine both go through these so
//! that folded and executed arithmetic agree. Overflow wraps; division
//! rounds toward negative infinity.

/// Floor division. `None` when `rhs` is zero.
pub fn floor_div(lhs: i32, rhs: i32) -> Option<i32> {
    if rhs == 0 {
        return None;
    }
    let q = lhs.wrapping_div(rhs);
    if lhs.wrapping_rem(rhs) != 0 && ((lhs < 0) != (rhs < 0)) {
        Some(q.wrapping_sub(1))
    } else {
        Some(q)
    }
}

/// Remainder matching [`floor_div`]: takes the sign of `rhs`.
pub fn floor_mod(lhs: i32, rhs: i32) -> Option<i32> {
    if rhs == 0 {
        return None;
    }
    let r = lhs.wrapping_rem(rhs);
    if r != 0 && ((r < 0) != (rhs < 0)) {
        Some(r.wrapping_add(rhs))
    } else {
        Some(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_floors() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(-7, -2), Some(3));
        assert_eq!(floor_div(1, 0), None);
        assert_eq!(floor_div(i32::MIN, -1), Some(i32::MIN));
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(floor_mod(7, 3), Some(1));
        assert_eq!(floor_mod(-7, 3), Some(2));
        assert_eq!(floor_mod(7, -3), Some(-2));
        assert_eq!(floor_mod(5, 0), None);
    }
}

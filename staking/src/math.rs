//! Overflow-free proportional-share arithmetic.
//!
//! Reward shares are `floor(pool × weight / total)`. With 18-decimal
//! amounts both factors routinely exceed 2^64, so the product is never
//! formed. Instead `a` is split into `q·c + r` with `r < c`:
//!
//! `a·b / c = q·b + r·b / c`
//!
//! The first term is at most the result, so it only overflows when the
//! result does. The second is accumulated bit by bit over `b` with every
//! intermediate kept below `c`.

use crate::StakingError;

/// Compute `floor(a × b / c)` without intermediate overflow.
///
/// Fails with [`StakingError::Overflow`] if `c` is zero or the quotient
/// does not fit in a `u128`.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, StakingError> {
    if c == 0 {
        return Err(StakingError::Overflow);
    }
    let (whole, part) = (a / c, a % c);
    let head = whole.checked_mul(b).ok_or(StakingError::Overflow)?;
    let tail = scaled_fraction(part, b, c).ok_or(StakingError::Overflow)?;
    head.checked_add(tail).ok_or(StakingError::Overflow)
}

/// `floor(part × b / c)` for `part < c`.
///
/// Walks `b` from its top bit down, keeping `part × prefix(b)` as
/// `quotient·c + rem` with `rem < c`.
fn scaled_fraction(part: u128, b: u128, c: u128) -> Option<u128> {
    if part == 0 || b == 0 {
        return Some(0);
    }
    let mut quotient: u128 = 0;
    let mut rem: u128 = 0;
    for bit in (0..u128::BITS - b.leading_zeros()).rev() {
        quotient = quotient.checked_mul(2)?;
        rem = add_reduced(rem, rem, c, &mut quotient)?;
        if (b >> bit) & 1 == 1 {
            rem = add_reduced(rem, part, c, &mut quotient)?;
        }
    }
    Some(quotient)
}

/// `(rem + x) mod c`, carrying one into `quotient` on wrap. Both inputs
/// must be below `c`.
fn add_reduced(rem: u128, x: u128, c: u128, quotient: &mut u128) -> Option<u128> {
    let room = c - x;
    if rem >= room {
        *quotient = quotient.checked_add(1)?;
        Some(rem - room)
    } else {
        Some(rem + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_match_naive() {
        assert_eq!(mul_div_floor(500, 500, 1500).unwrap(), 166);
        assert_eq!(mul_div_floor(500, 1000, 1500).unwrap(), 333);
        assert_eq!(mul_div_floor(0, 1000, 7).unwrap(), 0);
    }

    #[test]
    fn eighteen_decimal_amounts_do_not_overflow() {
        let unit = 10u128.pow(18);
        let pool = 1_000_000 * unit;
        let weight = 2_000_000 * unit;
        let total = 3_000_000 * unit;
        // 1e24 × 2e24 is far beyond u128, the quotient is not.
        assert_eq!(mul_div_floor(pool, weight, total).unwrap(), 666_666_666_666_666_666_666_666);
    }

    #[test]
    fn exact_when_weight_equals_total() {
        let big = u128::MAX / 3;
        assert_eq!(mul_div_floor(big, 12345, 12345).unwrap(), big);
    }

    #[test]
    fn matches_naive_when_product_fits() {
        for (a, b, c) in [(7u128, 9u128, 4u128), (1_000, 999, 37), (123_456_789, 987_654_321, 1_000_003), (5, 3, 15)] {
            assert_eq!(mul_div_floor(a, b, c).unwrap(), a * b / c, "{a}×{b}/{c}");
        }
    }

    #[test]
    fn quotient_at_the_u128_limit() {
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(mul_div_floor(u128::MAX, 2, 2).unwrap(), u128::MAX);
    }

    #[test]
    fn zero_divisor_and_oversized_quotient_fail() {
        assert!(matches!(mul_div_floor(1, 1, 0), Err(StakingError::Overflow)));
        assert!(matches!(mul_div_floor(u128::MAX, u128::MAX, 1), Err(StakingError::Overflow)));
    }
}

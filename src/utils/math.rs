//! Fixed-point integer arithmetic.
//!
//! All token and share amounts are `u128` base units. Products of two amounts
//! (for example `shares * assets`) can exceed `u128`, so proportional math goes
//! through a 256-bit intermediate.

use crate::error::{Error, Result};
use crate::utils::constants::BPS_DIVISOR;

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of two u128 values as (high, low)
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LOW_MASK);
    let (b1, b0) = (b >> 64, b & LOW_MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);
    let lo = (p00 & LOW_MASK) | (mid << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divides the 256-bit value (hi, lo) by `d`, returning (quotient, remainder).
/// None when the quotient does not fit in u128.
fn div_wide(hi: u128, lo: u128, d: u128) -> Option<(u128, u128)> {
    if hi >= d {
        return None;
    }
    let mut rem = hi;
    let mut quot = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quot <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1;
        }
    }
    Some((quot, rem))
}

fn mul_div_rem(a: u128, b: u128, c: u128) -> Result<(u128, u128)> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let (hi, lo) = mul_wide(a, b);
    if hi == 0 {
        return Ok((lo / c, lo % c));
    }
    div_wide(hi, lo, c).ok_or(Error::Overflow {
        operation: format!("({} * {}) / {}", a, b, c),
    })
}

/// Computes floor((a * b) / c) without intermediate overflow
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    mul_div_rem(a, b, c).map(|(q, _)| q)
}

/// Computes ceil((a * b) / c) without intermediate overflow
pub fn mul_div_up(a: u128, b: u128, c: u128) -> Result<u128> {
    let (q, r) = mul_div_rem(a, b, c)?;
    if r == 0 {
        Ok(q)
    } else {
        safe_add(q, 1)
    }
}

/// Portion of `amount` expressed in basis points (rounded down)
pub fn apply_bps(amount: u128, bps: u128) -> Result<u128> {
    mul_div(amount, bps, BPS_DIVISOR)
}

/// Reduces a big-endian unsigned integer modulo `n`
pub fn mod_be_bytes(bytes: &[u8], n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let n = n as u64;
    bytes
        .iter()
        .fold(0u64, |acc, &b| (acc * 256 + b as u64) % n) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_safe_arithmetic() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert!(safe_add(u128::MAX, 1).is_err());
        assert_eq!(safe_sub(5, 3).unwrap(), 2);
        assert!(matches!(safe_sub(3, 5), Err(Error::Underflow { .. })));
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        let e27 = 10u128.pow(27);
        // e27 * e27 overflows u128, the quotient does not
        assert_eq!(mul_div(e27, e27, e27).unwrap(), e27);
        assert_eq!(mul_div(e27, 3 * e27, 2 * e27).unwrap(), 3 * e27 / 2);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_errors() {
        assert!(matches!(mul_div(1, 1, 0), Err(Error::InvalidParameter { .. })));
        assert!(matches!(mul_div(u128::MAX, 2, 1), Err(Error::Overflow { .. })));
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_up(10, 1, 3).unwrap(), 4);
        assert_eq!(mul_div_up(9, 1, 3).unwrap(), 3);
    }

    #[test]
    fn test_apply_bps() {
        // 1% of 101,000
        assert_eq!(apply_bps(101_000, 100).unwrap(), 1_010);
        assert_eq!(apply_bps(99, 100).unwrap(), 0);
    }

    #[test]
    fn test_mod_be_bytes() {
        let mut bytes = [0u8; 32];
        bytes[31] = 139;
        assert_eq!(mod_be_bytes(&bytes, 100), 39);

        // 256 mod 100
        bytes[30] = 1;
        bytes[31] = 0;
        assert_eq!(mod_be_bytes(&bytes, 100), 56);

        assert_eq!(mod_be_bytes(&[0xff; 32], 1), 0);
    }

    proptest! {
        #[test]
        fn prop_mul_div_matches_narrow(a in 0u128..(1u128 << 60), b in 0u128..(1u128 << 60), c in 1u128..u64::MAX as u128) {
            prop_assert_eq!(mul_div(a, b, c).unwrap(), a * b / c);
        }

        #[test]
        fn prop_mul_div_wide_identity(a: u128, c in 1u128..) {
            prop_assert_eq!(mul_div(a, c, c).unwrap(), a);
        }

        #[test]
        fn prop_mod_matches_u128(v: u128, n in 1u32..1000) {
            prop_assert_eq!(mod_be_bytes(&v.to_be_bytes(), n) as u128, v % n as u128);
        }
    }
}

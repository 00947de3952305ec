//! Saturating fixed-point arithmetic for the pricing controller.
//!
//! Everything here is integer math with explicit rounding. The controller is
//! consensus-critical: two hosts must agree on every bit, so IEEE-754 floats
//! are banned and overflow saturates instead of wrapping or trapping.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Basis points, units of 1/10 000.
///
/// Signed, because the exponent handed to [`approx_exp_bips`] goes negative
/// whenever the chain runs below its speed limit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Bips(pub i64);

/// One whole, expressed in basis points.
pub const ONE_IN_BIPS: Bips = Bips(10_000);

impl Bips {
    /// Converts a percentage into basis points.
    pub const fn from_percent(percent: u64) -> Self {
        Self(sat_cast_i64(percent.saturating_mul(100)))
    }

    /// Converts a natural number into basis points, saturating at the bounds.
    pub const fn from_natural(value: i64) -> Self {
        Self(value.saturating_mul(ONE_IN_BIPS.0))
    }

    /// The raw basis-point count.
    pub const fn raw(self) -> i64 {
        self.0
    }
}

/// Clamps a signed value into u64, mapping negatives to zero.
pub const fn sat_ucast(value: i64) -> u64 {
    if value < 0 {
        0
    } else {
        value as u64
    }
}

/// Clamps an unsigned value into i64, saturating at `i64::MAX`.
pub const fn sat_cast_i64(value: u64) -> i64 {
    if value > i64::MAX as u64 {
        i64::MAX
    } else {
        value as i64
    }
}

/// Scales a signed quantity by basis points, rounding toward zero.
pub const fn int_mul_by_bips(value: i64, bips: Bips) -> i64 {
    let scaled = value as i128 * bips.0 as i128 / ONE_IN_BIPS.0 as i128;
    if scaled > i64::MAX as i128 {
        i64::MAX
    } else if scaled < i64::MIN as i128 {
        i64::MIN
    } else {
        scaled as i64
    }
}

/// Approximates `e^(x / 10 000)` in basis points.
///
/// Four Maclaurin terms evaluated in Horner form over u64 basis points,
/// `e^x ~ 1 + x(1 + x/2(1 + x/3(1 + x/4)))`, with the negative domain folded
/// through the reciprocal `10 000^2 / approx_exp_bips(-x)`. The result is
/// monotonically non-decreasing, equals [`ONE_IN_BIPS`] exactly at zero, and
/// saturates for large arguments instead of overflowing.
///
/// The term count and the floor divisions below are consensus. Every
/// implementation must reproduce them exactly; do not add terms or change the
/// rounding.
pub fn approx_exp_bips(value: Bips) -> Bips {
    let x = value.0.unsigned_abs();
    let one = ONE_IN_BIPS.0 as u64;

    let mut res = one + x / 4;
    res = one + res.saturating_mul(x) / (3 * one);
    res = one + res.saturating_mul(x) / (2 * one);
    res = one + res.saturating_mul(x) / one;

    if value.0 < 0 {
        Bips((one * one / res) as i64)
    } else {
        Bips(sat_cast_i64(res))
    }
}

/// Multiplies a wei-denominated price by basis points, rounding down.
pub fn big_mul_by_bips(value: U256, bips: Bips) -> U256 {
    if bips.0 <= 0 {
        return U256::ZERO;
    }
    value.saturating_mul(U256::from(bips.0 as u64)) / U256::from(ONE_IN_BIPS.0 as u64)
}

/// Multiplies a wei-denominated price by an integer, saturating at the bound.
pub fn big_mul_by_uint(value: U256, factor: u64) -> U256 {
    value.saturating_mul(U256::from(factor))
}

/// An exact non-negative ratio held as a numerator and denominator.
///
/// The pool-based model mixes two of these under basis-point weights. Keeping
/// them rational until the final truncation preserves monotonicity in the
/// inputs, which a float intermediate would not guarantee across hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UFrac {
    num: u64,
    den: u64,
}

impl UFrac {
    /// The zero ratio.
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// Builds the ratio `num / den`.
    pub const fn new(num: u64, den: u64) -> Self {
        Self { num, den }
    }
}

/// Weighted average of two ratios, truncated to u64 basis points:
/// `weight * a + (10 000 - weight) * b`.
///
/// Exact up to the final floor division; the intermediate products live in
/// `U256` and cannot overflow. Saturates to `u64::MAX` if either denominator
/// is zero.
pub fn weighted_average_bips(weight: Bips, a: UFrac, b: UFrac) -> u64 {
    let one = ONE_IN_BIPS.0 as u64;
    let w = sat_ucast(weight.0).min(one);
    let counter_weight = one - w;

    let den = U256::from(a.den).saturating_mul(U256::from(b.den));
    if den.is_zero() {
        return u64::MAX;
    }
    let num = U256::from(w) * U256::from(a.num) * U256::from(b.den)
        + U256::from(counter_weight) * U256::from(b.num) * U256::from(a.den);
    (num / den).saturating_to::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_is_exact_at_zero() {
        assert_eq!(approx_exp_bips(Bips(0)), ONE_IN_BIPS);
    }

    #[test]
    fn exp_known_values() {
        // hand-evaluated against the Horner scheme; these are consensus
        assert_eq!(approx_exp_bips(Bips(833)).raw(), 10_868);
        assert_eq!(approx_exp_bips(Bips(8_823)).raw(), 24_111);
        assert_eq!(approx_exp_bips(Bips(10_000)).raw(), 27_083);
        assert_eq!(approx_exp_bips(Bips(-10_000)).raw(), 3_692);
    }

    #[test]
    fn exp_is_monotonic() {
        let mut prev = approx_exp_bips(Bips(-50_000));
        for x in (-50_000..=50_000).step_by(37) {
            let cur = approx_exp_bips(Bips(x));
            assert!(cur >= prev, "exp regressed at {x}");
            prev = cur;
        }
    }

    #[test]
    fn exp_negative_domain_stays_below_one() {
        for x in [-1, -100, -10_000, -1_000_000, i64::MIN] {
            assert!(approx_exp_bips(Bips(x)) <= ONE_IN_BIPS);
        }
    }

    #[test]
    fn exp_saturates_instead_of_overflowing() {
        // once the multiplications saturate the result plateaus
        let plateau = 1_844_674_407_380_955;
        assert_eq!(approx_exp_bips(Bips(i64::MAX)).raw(), plateau);
        assert_eq!(approx_exp_bips(Bips(i64::MAX / 2)).raw(), plateau);
    }

    #[test]
    fn saturating_casts() {
        assert_eq!(sat_ucast(-1), 0);
        assert_eq!(sat_ucast(i64::MIN), 0);
        assert_eq!(sat_ucast(42), 42);
        assert_eq!(sat_cast_i64(u64::MAX), i64::MAX);
        assert_eq!(sat_cast_i64(7), 7);
    }

    #[test]
    fn bips_constructors() {
        assert_eq!(Bips::from_percent(80).raw(), 8_000);
        assert_eq!(Bips::from_natural(3).raw(), 30_000);
        assert_eq!(Bips::from_natural(i64::MAX).raw(), i64::MAX);
    }

    #[test]
    fn int_mul_rounds_toward_zero() {
        assert_eq!(int_mul_by_bips(600_000_000, Bips::from_percent(80)), 480_000_000);
        assert_eq!(int_mul_by_bips(3, Bips(1)), 0);
        assert_eq!(int_mul_by_bips(-3, Bips(1)), 0);
    }

    #[test]
    fn big_mul_floors() {
        let wei = U256::from(100_000_000u64);
        assert_eq!(big_mul_by_bips(wei, Bips(10_001)), U256::from(100_010_000u64));
        assert_eq!(big_mul_by_bips(U256::from(3u64), Bips(9_999)), U256::from(2u64));
        assert_eq!(big_mul_by_bips(wei, Bips(-5)), U256::ZERO);
    }

    #[test]
    fn weighted_average_is_exact() {
        // 0.6 * 3/4 + 0.4 * 1 = 0.85
        let avg =
            weighted_average_bips(Bips::from_percent(60), UFrac::new(3, 4), UFrac::new(1, 1));
        assert_eq!(avg, 8_500);
    }

    #[test]
    fn weighted_average_saturates_on_zero_denominator() {
        let avg = weighted_average_bips(ONE_IN_BIPS, UFrac::new(1, 0), UFrac::new(1, 1));
        assert_eq!(avg, u64::MAX);
    }

    #[test]
    fn weighted_average_truncates() {
        // 1.0 * 1/3 = 3333.33 bips
        let avg = weighted_average_bips(ONE_IN_BIPS, UFrac::new(1, 3), UFrac::ZERO);
        assert_eq!(avg, 3_333);
    }
}

//! Percent - a fraction in `[0, 1]` used for theft and penalty rates
//!
//! Stored as basis points so `floor(amount * p)` is exact integer math and
//! never drifts the way `f64` multiplication does near whole numbers.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const BASIS_POINTS: u32 = 10_000;

/// A percentage in the closed range `[0, 1]`.
///
/// Serialized as a plain fraction (`0.1` for ten percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percent {
    basis_points: u32,
}

impl Percent {
    pub const ZERO: Percent = Percent { basis_points: 0 };
    pub const FULL: Percent = Percent {
        basis_points: BASIS_POINTS,
    };

    /// Build from a fraction. Rejects NaN and anything outside `[0, 1]`.
    pub fn new(fraction: f64) -> Result<Self, DomainError> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(DomainError::validation(format!(
                "percent must be within 0..=1, got {fraction}"
            )));
        }
        Ok(Self {
            basis_points: (fraction * f64::from(BASIS_POINTS)).round() as u32,
        })
    }

    /// Build from basis points (`1000` is ten percent), saturating at 100%.
    pub const fn from_basis_points(basis_points: u32) -> Self {
        let basis_points = if basis_points > BASIS_POINTS {
            BASIS_POINTS
        } else {
            basis_points
        };
        Self { basis_points }
    }

    /// Build from whole percentage points (`10` is ten percent).
    pub fn from_points(points: u32) -> Result<Self, DomainError> {
        if points > 100 {
            return Err(DomainError::validation(format!(
                "percent must be within 0..=100 points, got {points}"
            )));
        }
        Ok(Self {
            basis_points: points * 100,
        })
    }

    #[inline]
    pub fn fraction(self) -> f64 {
        f64::from(self.basis_points) / f64::from(BASIS_POINTS)
    }

    #[inline]
    pub fn basis_points(self) -> u32 {
        self.basis_points
    }

    /// `floor(amount * p)`, clamped to `[0, amount]`.
    ///
    /// Negative balances are treated as zero, so the result is never negative and
    /// `amount - share_of(amount)` never drops below zero for `amount >= 0`.
    pub fn share_of(self, amount: i64) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let share = i128::from(amount) * i128::from(self.basis_points) / i128::from(BASIS_POINTS);
        // share <= amount because basis_points <= BASIS_POINTS
        share as i64
    }
}

impl TryFrom<f64> for Percent {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for f64 {
    fn from(value: Percent) -> Self {
        value.fraction()
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", f64::from(self.basis_points) / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_is_floor_of_balance_times_rate() {
        let ten = Percent::new(0.10).expect("valid");
        assert_eq!(ten.share_of(1000), 100);
        assert_eq!(ten.share_of(29), 2);
        assert_eq!(ten.share_of(9), 0);

        let half = Percent::new(0.5).expect("valid");
        assert_eq!(half.share_of(101), 50);
    }

    #[test]
    fn share_never_exceeds_balance() {
        let rates = [0.0, 0.01, 0.1, 0.29, 0.5, 0.99, 1.0];
        for rate in rates {
            let p = Percent::new(rate).expect("valid");
            for g in [0_i64, 1, 7, 99, 100, 1_000, 123_457, i64::MAX] {
                let stolen = p.share_of(g);
                assert!(stolen >= 0, "rate {rate} balance {g}");
                assert!(g - stolen >= 0, "rate {rate} balance {g}");
            }
        }
    }

    #[test]
    fn whole_number_products_do_not_lose_a_unit() {
        // 0.29 * 100 is 28.999... in f64
        let p = Percent::new(0.29).expect("valid");
        assert_eq!(p.share_of(100), 29);
    }

    #[test]
    fn negative_balance_yields_nothing() {
        assert_eq!(Percent::FULL.share_of(-50), 0);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Percent::new(-0.01).is_err());
        assert!(Percent::new(1.01).is_err());
        assert!(Percent::new(f64::NAN).is_err());
        assert!(Percent::from_points(101).is_err());
    }

    #[test]
    fn serializes_as_fraction() {
        let p = Percent::from_points(25).expect("valid");
        let json = serde_json::to_string(&p).expect("serialize");
        assert_eq!(json, "0.25");
        let back: Percent = serde_json::from_str("0.5").expect("deserialize");
        assert_eq!(back, Percent::from_points(50).expect("valid"));
        assert!(serde_json::from_str::<Percent>("1.5").is_err());
    }
}

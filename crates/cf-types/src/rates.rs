//! Flow-rate vectors on the four-channel rate simplex.

use serde::{Deserialize, Serialize};

use crate::errors::{CfError, CfResult};

/// Number of independently controllable flow channels. The scout-step
/// algorithm and the rate scaler are specialized to exactly this count.
pub const CHANNEL_COUNT: usize = 4;

/// Default fixed total flow across all channels (µl/min).
pub const DEFAULT_TOTAL_RATE: f64 = 600.0;

/// Channel labels in pump daisy-chain order.
pub const CHANNEL_LABELS: [&str; CHANNEL_COUNT] = ["cyan", "magenta", "water", "yellow"];

/// An ordered 4-tuple of per-channel flow rates (µl/min).
///
/// Invariant: entries are non-negative and sum to the configured total flow,
/// except transiently during computation. [`RateVector::normalized_to`]
/// restores the fixed-sum invariant before a vector reaches the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateVector(pub [f64; CHANNEL_COUNT]);

impl RateVector {
    pub fn new(rates: [f64; CHANNEL_COUNT]) -> Self {
        Self(rates)
    }

    /// Split `total` evenly across all channels.
    pub fn uniform(total: f64) -> Self {
        Self([total / CHANNEL_COUNT as f64; CHANNEL_COUNT])
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    /// Proportionally rescale so the entries sum to `total`, preserving the
    /// relative proportions among channels.
    pub fn normalized_to(&self, total: f64) -> CfResult<Self> {
        let sum = self.sum();
        if sum == 0.0 || !sum.is_finite() {
            return Err(CfError::DegenerateScale(format!(
                "cannot normalize rates {self} with sum {sum}"
            )));
        }
        let factor = total / sum;
        Ok(Self(self.0.map(|r| r * factor)))
    }

    /// Reject vectors that are unsafe to send to the actuator: non-finite or
    /// negative entries.
    pub fn validate(&self) -> CfResult<()> {
        for (i, r) in self.0.iter().enumerate() {
            if !r.is_finite() {
                return Err(CfError::InvalidInput(format!(
                    "non-finite rate {r} on channel {}",
                    CHANNEL_LABELS[i]
                )));
            }
            if *r < 0.0 {
                return Err(CfError::InvalidInput(format!(
                    "negative rate {r} on channel {}",
                    CHANNEL_LABELS[i]
                )));
            }
        }
        Ok(())
    }

    /// Whether the vector lies on the rate simplex for the given total,
    /// within floating tolerance.
    pub fn is_feasible(&self, total: f64, tolerance: f64) -> bool {
        self.0.iter().all(|r| *r >= -tolerance) && (self.sum() - total).abs() <= tolerance
    }
}

impl std::ops::Index<usize> for RateVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl std::ops::IndexMut<usize> for RateVector {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

impl std::fmt::Display for RateVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.1}, {:.1}, {:.1}, {:.1}]",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_splits_total() {
        let r = RateVector::uniform(DEFAULT_TOTAL_RATE);
        assert_eq!(r.0, [150.0; 4]);
        assert!((r.sum() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_preserves_proportions() {
        let r = RateVector::new([1.0, 2.0, 3.0, 4.0])
            .normalized_to(600.0)
            .unwrap();
        assert!((r.sum() - 600.0).abs() < 1e-9);
        assert!((r[1] / r[0] - 2.0).abs() < 1e-9);
        assert!((r[3] / r[2] - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_zero_sum_is_degenerate() {
        let r = RateVector::new([0.0; 4]);
        assert!(matches!(
            r.normalized_to(600.0),
            Err(CfError::DegenerateScale(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_and_nan() {
        assert!(RateVector::new([150.0, 150.0, 150.0, 150.0])
            .validate()
            .is_ok());
        assert!(matches!(
            RateVector::new([-1.0, 0.0, 0.0, 601.0]).validate(),
            Err(CfError::InvalidInput(_))
        ));
        assert!(matches!(
            RateVector::new([f64::NAN, 0.0, 0.0, 0.0]).validate(),
            Err(CfError::InvalidInput(_))
        ));
    }

    #[test]
    fn feasibility_uses_tolerance() {
        let r = RateVector::new([150.0, 150.0, 150.0, 150.0 + 1e-10]);
        assert!(r.is_feasible(600.0, 1e-6));
        assert!(!RateVector::new([300.0, 300.0, 300.0, 0.0]).is_feasible(600.0, 1e-6));
    }
}

//! Scout-step planning and finite-difference gradient estimation.
//!
//! A scout step perturbs exactly one channel of the current real-step rates
//! before committing to the next real step. Four scouts (one per channel)
//! yield an axis-aligned finite-difference gradient; because each scout
//! moves only its own channel, the per-sample contributions sum into a full
//! per-channel step with no averaging.

use rand::Rng;
use serde::{Deserialize, Serialize};

use cf_types::{CfError, CfResult, Color, RateVector, ScoutStep, CHANNEL_COUNT};

use crate::cost::cost;

/// Per-channel partial derivative estimates, used directly as the
/// `delta_rates` input to the rate scaler.
pub type GradientEstimate = [f64; CHANNEL_COUNT];

/// One scout measurement: the perturbed rates and what the sensor saw
/// there. The cost is derived from the color at accumulation time, so a
/// sample carries no value that could go stale between the measurement and
/// the gradient. Created and consumed within a single real-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutSample {
    pub rates: RateVector,
    pub color: Color,
}

/// Resolve the scout step policy into a concrete magnitude for this
/// real-step, clamped to the configured floor so the perturbation stays
/// above measurement noise.
pub fn effective_step_size(policy: ScoutStep, floor: f64) -> f64 {
    let size = match policy {
        ScoutStep::Fixed { size } => size,
        ScoutStep::Randomized { min, max } => {
            if min >= max {
                min
            } else {
                rand::thread_rng().gen_range(min..=max)
            }
        }
    };
    size.max(floor)
}

/// The four perturbed rate vectors for one real-step: plan `k` raises only
/// channel `k` by `step_size`.
pub fn scout_plan(base: &RateVector, step_size: f64) -> [RateVector; CHANNEL_COUNT] {
    std::array::from_fn(|k| {
        let mut rates = *base;
        rates[k] += step_size;
        rates
    })
}

/// Fold the four scout samples into a gradient estimate.
///
/// For sample `k` and channel `j` the contribution is
/// `-learning_rate * (cost_k - base_cost) / (rates_k[j] - base[j])`, with
/// zero-denominator channels contributing nothing. Each sample perturbs only
/// its own channel, so the summation reconstructs one entry per channel.
pub fn accumulate_gradient(
    target: &Color,
    samples: &[ScoutSample],
    base_rates: &RateVector,
    base_cost: f64,
    learning_rate: f64,
) -> CfResult<GradientEstimate> {
    if samples.len() != CHANNEL_COUNT {
        return Err(CfError::InvalidInput(format!(
            "gradient estimation needs {CHANNEL_COUNT} scout samples, got {}",
            samples.len()
        )));
    }

    let mut gradient = [0.0; CHANNEL_COUNT];
    for sample in samples {
        let scout_cost = cost(target, &sample.color)?;
        for j in 0..CHANNEL_COUNT {
            let denom = sample.rates[j] - base_rates[j];
            if denom != 0.0 {
                gradient[j] += -learning_rate * (scout_cost - base_cost) / denom;
            }
        }
    }
    Ok(gradient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_perturbs_one_channel_each() {
        let base = RateVector::new([150.0, 150.0, 150.0, 150.0]);
        let plans = scout_plan(&base, 30.0);
        for (k, plan) in plans.iter().enumerate() {
            for j in 0..CHANNEL_COUNT {
                let expected = if j == k { 180.0 } else { 150.0 };
                assert_eq!(plan[j], expected);
            }
        }
    }

    #[test]
    fn fixed_step_respects_floor() {
        assert_eq!(effective_step_size(ScoutStep::Fixed { size: 30.0 }, 18.0), 30.0);
        assert_eq!(effective_step_size(ScoutStep::Fixed { size: 5.0 }, 18.0), 18.0);
    }

    #[test]
    fn randomized_step_stays_in_range_and_above_floor() {
        for _ in 0..50 {
            let size = effective_step_size(ScoutStep::Randomized { min: 20.0, max: 40.0 }, 18.0);
            assert!((20.0..=40.0).contains(&size));
        }
        for _ in 0..50 {
            let size = effective_step_size(ScoutStep::Randomized { min: 2.0, max: 10.0 }, 18.0);
            assert_eq!(size, 18.0);
        }
    }

    #[test]
    fn flat_landscape_yields_zero_gradient() {
        let target = Color::rgb(0.0, 0.0, 200.0);
        let base = RateVector::new([150.0, 150.0, 150.0, 150.0]);
        let measured = Color::rgb(100.0, 100.0, 100.0);
        let base_cost = cost(&target, &measured).unwrap();

        let samples: Vec<ScoutSample> = scout_plan(&base, 30.0)
            .into_iter()
            .map(|rates| ScoutSample {
                rates,
                color: measured.clone(),
            })
            .collect();

        let gradient = accumulate_gradient(&target, &samples, &base, base_cost, 0.6).unwrap();
        assert_eq!(gradient, [0.0; CHANNEL_COUNT]);
    }

    #[test]
    fn each_sample_feeds_only_its_own_channel() {
        let target = Color::rgb(0.0, 0.0, 200.0);
        let base = RateVector::new([100.0, 150.0, 200.0, 150.0]);
        let base_color = Color::rgb(166.0, 174.0, 176.0);
        let base_cost = cost(&target, &base_color).unwrap();

        // Only the channel-1 scout sees a different color; all gradient mass
        // must land on channel 1.
        let better = Color::rgb(160.0, 173.0, 176.0);
        let samples: Vec<ScoutSample> = scout_plan(&base, 2.0)
            .into_iter()
            .enumerate()
            .map(|(k, rates)| {
                let color = if k == 1 { better.clone() } else { base_color.clone() };
                ScoutSample { rates, color }
            })
            .collect();

        let gradient = accumulate_gradient(&target, &samples, &base, base_cost, 0.01).unwrap();
        assert_eq!(gradient[0], 0.0);
        assert_eq!(gradient[2], 0.0);
        assert_eq!(gradient[3], 0.0);

        // Matches the hand-computed finite difference:
        // -lr * (cost(better) - base_cost) / 2.0
        let scout_cost = cost(&target, &better).unwrap();
        let expected = -0.01 * (scout_cost - base_cost) / 2.0;
        assert!((gradient[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn wrong_sample_count_rejected() {
        let target = Color::rgb(0.0, 0.0, 0.0);
        let base = RateVector::uniform(600.0);
        let err = accumulate_gradient(&target, &[], &base, 1.0, 0.6);
        assert!(matches!(err, Err(CfError::InvalidInput(_))));
    }
}

//! Projection of a proposed rate update back onto the feasible simplex.

use cf_types::{CfError, CfResult, RateVector, CHANNEL_COUNT};

/// Apply `delta` to `old` and project the result onto the rate simplex
/// (all entries >= 0, sum == `total_rate`).
///
/// A channel already at its floor cannot be pushed further negative, so a
/// non-positive delta on a floored channel is dropped outright rather than
/// accumulating a debt that never escapes zero. If the naive sum still has a
/// negative minimum, the whole delta is shrunk uniformly so the most
/// violating channel lands exactly at zero while the step keeps its
/// direction in the other channels; channels the shrink still leaves below
/// zero are clamped to the floor. A final proportional renormalization
/// restores the fixed-sum invariant.
pub fn scale_rates(old: &RateVector, delta: &RateVector, total_rate: f64) -> CfResult<RateVector> {
    let mut delta = *delta;

    for i in 0..CHANNEL_COUNT {
        if old[i] <= 0.0 && delta[i] <= 0.0 {
            delta[i] = 0.0;
        }
    }

    let mut candidate = [0.0; CHANNEL_COUNT];
    for i in 0..CHANNEL_COUNT {
        candidate[i] = old[i] + delta[i];
    }

    // Minimum candidate entry, ties broken by lowest index.
    let mut idx_min = 0;
    for i in 1..CHANNEL_COUNT {
        if candidate[i] < candidate[idx_min] {
            idx_min = i;
        }
    }

    if candidate[idx_min] < 0.0 {
        if old[idx_min] == 0.0 {
            // The floor clamp above zeroes every non-positive delta on a
            // zeroed channel, so reaching here means the inputs violated the
            // scaler's contract (e.g. a negative old rate).
            return Err(CfError::DegenerateScale(format!(
                "channel {idx_min} is zero in old rates {old} yet is the violating minimum"
            )));
        }
        let shrink = (delta[idx_min] / old[idx_min]).abs();
        if shrink == 0.0 || !shrink.is_finite() {
            return Err(CfError::DegenerateScale(format!(
                "shrink factor {shrink} from old {old} and delta {delta}"
            )));
        }
        for d in &mut delta.0 {
            *d /= shrink;
        }
    }

    // One uniform shrink only floors the pre-shrink minimum; a channel with
    // a small old rate and a proportionally larger negative delta can still
    // undershoot, so residual negatives clamp to zero.
    let mut adjusted = [0.0; CHANNEL_COUNT];
    for i in 0..CHANNEL_COUNT {
        adjusted[i] = (old[i] + delta[i]).max(0.0);
    }
    RateVector::new(adjusted).normalized_to(total_rate)
}

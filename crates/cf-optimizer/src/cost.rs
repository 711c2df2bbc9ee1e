//! Scalar discrepancy between a measured color and the target.

use cf_types::{CfError, CfResult, Color};

/// Mean squared per-channel error between `target` and `measured`. Zero is
/// the ideal; the value is symmetric in its arguments.
pub fn cost(target: &Color, measured: &Color) -> CfResult<f64> {
    if target.len() != measured.len() || target.is_empty() {
        return Err(CfError::InvalidInput(format!(
            "cost requires matching channel counts, got {} vs {}",
            target.len(),
            measured.len()
        )));
    }
    let sum: f64 = target
        .channels
        .iter()
        .zip(&measured.channels)
        .map(|(t, m)| (t - m) * (t - m))
        .sum();
    Ok(sum / target.len() as f64)
}

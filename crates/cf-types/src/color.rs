//! Measured and target colors.

use serde::{Deserialize, Serialize};

use crate::errors::{CfError, CfResult};

/// Upper bound of a color channel as reported by the spectrometer pipeline.
pub const CHANNEL_MAX: f64 = 255.0;

/// A color as an ordered vector of channel intensities (RGB in practice,
/// each channel in `0..=255`).
///
/// Channels are stored as a `Vec` rather than a fixed array: the sensor
/// boundary is untrusted, so a reading with the wrong dimensionality must be
/// representable in order to be rejected with [`CfError::InvalidInput`]
/// instead of silently coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub channels: Vec<f64>,
}

impl Color {
    /// Create a three-channel RGB color.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self {
            channels: vec![r, g, b],
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Reject non-finite channel values.
    pub fn validate(&self) -> CfResult<()> {
        if self.channels.iter().any(|c| !c.is_finite()) {
            return Err(CfError::InvalidInput(format!(
                "color contains non-finite channel: {self}"
            )));
        }
        Ok(())
    }

    /// Clamp every channel into `0..=CHANNEL_MAX`.
    pub fn clamped(mut self) -> Self {
        for c in &mut self.channels {
            *c = c.clamp(0.0, CHANNEL_MAX);
        }
        self
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.channels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c:.1}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_constructor_orders_channels() {
        let c = Color::rgb(10.0, 20.0, 30.0);
        assert_eq!(c.channels, vec![10.0, 20.0, 30.0]);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn validate_rejects_nan() {
        let c = Color::rgb(1.0, f64::NAN, 3.0);
        assert!(matches!(c.validate(), Err(CfError::InvalidInput(_))));
    }

    #[test]
    fn clamp_bounds_channels() {
        let c = Color::rgb(-5.0, 128.0, 300.0).clamped();
        assert_eq!(c.channels, vec![0.0, 128.0, 255.0]);
    }
}

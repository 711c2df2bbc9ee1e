//! Saturating regions of color space.
//!
//! The dye set cannot reproduce every RGB value; calibration of the rig
//! identified three regions where the mix is pressed against a physical
//! limit and gradient descent tends to stall. Measured colors inside any of
//! them are worth a warning, not an error.

use cf_types::{BoundaryConfig, Color};

/// Which saturating region a color fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryRegion {
    /// Green channel at or below its achievable floor.
    GreenFloor,
    /// High blue with disproportionately low green.
    BlueSaturation,
    /// Low red with disproportionately low green.
    RedSaturation,
}

/// Classify a measured color against the boundary thresholds. Colors that
/// are not three-channel (a malformed sensor reading caught elsewhere) are
/// never classified.
pub fn boundary_region(color: &Color, config: &BoundaryConfig) -> Option<BoundaryRegion> {
    let [r, g, b] = match color.channels.as_slice() {
        [r, g, b] => [*r, *g, *b],
        _ => return None,
    };

    if g <= config.green_floor {
        return Some(BoundaryRegion::GreenFloor);
    }
    if b > config.blue_threshold && g < config.blue_green_slope * b - config.blue_green_offset {
        return Some(BoundaryRegion::BlueSaturation);
    }
    if r < config.red_threshold && g < config.red_green_offset - config.red_green_slope * r {
        return Some(BoundaryRegion::RedSaturation);
    }
    None
}

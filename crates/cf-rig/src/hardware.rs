//! Abstract actuator/sensor contracts.

use async_trait::async_trait;
use cf_types::{CfError, Color, RateVector};

/// Errors surfaced by the hardware boundary. These are faults, not
/// conditions the optimization core retries.
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    #[error("rig is not connected")]
    NotConnected,
    #[error("pumps are not running")]
    NotRunning,
    #[error("actuator fault: {message}")]
    Actuator { message: String },
    #[error("sensor fault: {message}")]
    Sensor { message: String },
}

/// Result alias for hardware operations.
pub type RigResult<T> = Result<T, RigError>;

impl From<RigError> for CfError {
    fn from(err: RigError) -> Self {
        CfError::Rig(err.to_string())
    }
}

/// The four-channel pump bank.
///
/// Implementations may talk to real daisy-chained syringe pumps over a
/// serial wire protocol or simulate the mix locally (see
/// [`crate::sim_rig`]). Errors are hardware faults and are surfaced, not
/// retried, by the core.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Command per-channel flow rates. Rates must already be feasible; the
    /// actuator does not project onto the simplex.
    async fn set_rates(&mut self, rates: &RateVector) -> RigResult<()>;

    /// Start infusing at the last commanded rates.
    async fn start(&mut self) -> RigResult<()>;

    /// Stop all pumps. Must be safe to call at any time, including after a
    /// fault; cancellation paths rely on it.
    async fn stop(&mut self) -> RigResult<()>;
}

/// The color sensor observing the flow cell.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Take one settled reading. Resolves only once a stable color is
    /// available, or fails on hardware error. The reading is a three-channel
    /// color in `0..=255` per channel.
    async fn measure(&mut self) -> RigResult<Color>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rig_errors_convert_into_core_errors() {
        let err: CfError = RigError::Sensor {
            message: "integration timeout".into(),
        }
        .into();
        match err {
            CfError::Rig(message) => assert!(message.contains("integration timeout")),
            other => panic!("expected rig error, got {other:?}"),
        }
    }
}

//! Run configuration, fixed at experiment start (no hot reload).

use serde::{Deserialize, Serialize};

use crate::errors::{CfError, CfResult};
use crate::rates::{RateVector, DEFAULT_TOTAL_RATE};

/// How the scout perturbation magnitude is chosen each real-step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoutStep {
    /// Same magnitude every real-step.
    Fixed { size: f64 },
    /// Fresh magnitude drawn uniformly from `min..=max` each real-step.
    Randomized { min: f64, max: f64 },
}

impl Default for ScoutStep {
    fn default() -> Self {
        Self::Fixed { size: 30.0 }
    }
}

/// Thresholds for the three saturating regions of color space. A measured
/// color inside any region means the mix is pressed against a physical limit
/// of the dyes and may stop improving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Region 1: green at or below this value.
    pub green_floor: f64,
    /// Region 2: blue above this value...
    pub blue_threshold: f64,
    /// ...while green < blue_green_slope * blue - blue_green_offset.
    pub blue_green_slope: f64,
    pub blue_green_offset: f64,
    /// Region 3: red below this value...
    pub red_threshold: f64,
    /// ...while green < red_green_offset - red_green_slope * red.
    pub red_green_slope: f64,
    pub red_green_offset: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            green_floor: 85.0,
            blue_threshold: 180.0,
            blue_green_slope: 1.2,
            blue_green_offset: 126.0,
            red_threshold: 150.0,
            red_green_slope: 0.9,
            red_green_offset: 220.0,
        }
    }
}

/// Top-level configuration for one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Fixed total flow across all four channels (µl/min).
    pub total_rate: f64,

    /// Maximum number of real-step iterations per strategy.
    pub max_iterations: usize,

    /// Cost below which the gradient-descent run is declared converged.
    /// The default reflects the measured MSE floor of the blue dye.
    pub convergence_threshold: f64,

    /// Gradient-descent learning rate.
    pub learning_rate: f64,

    /// Scout perturbation sizing policy.
    pub scout_step: ScoutStep,

    /// Hard lower bound on the scout step size: perturbations smaller than
    /// this drown in the ±3% RGB measurement noise.
    pub scout_step_floor: f64,

    /// Exploration parameter for the Bayesian acquisition (UCB kappa).
    pub kappa: f64,

    /// Number of random candidates scored per Bayesian acquisition round.
    pub candidate_pool: usize,

    /// Absolute cost increase over the previous real-step that triggers a
    /// regression warning (trapped gas bubbles show up this way).
    pub regression_margin: f64,

    /// Physical settling/diffusion wait after actuating new rates, seconds.
    pub settle_secs: f64,

    /// Rates actuated on the first real-step of every strategy.
    pub initial_rates: RateVector,

    pub boundary: BoundaryConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            total_rate: DEFAULT_TOTAL_RATE,
            max_iterations: 30,
            convergence_threshold: 150.0,
            learning_rate: 0.6,
            scout_step: ScoutStep::default(),
            scout_step_floor: 18.0,
            kappa: 10.0,
            candidate_pool: 256,
            regression_margin: 3000.0,
            settle_secs: 5.0,
            initial_rates: RateVector::uniform(DEFAULT_TOTAL_RATE),
            boundary: BoundaryConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> CfResult<()> {
        if self.total_rate <= 0.0 || !self.total_rate.is_finite() {
            return Err(CfError::Config(format!(
                "total_rate must be positive, got {}",
                self.total_rate
            )));
        }
        if self.max_iterations == 0 {
            return Err(CfError::Config("max_iterations must be at least 1".into()));
        }
        if self.learning_rate <= 0.0 {
            return Err(CfError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.convergence_threshold < 0.0 {
            return Err(CfError::Config(format!(
                "convergence_threshold must be non-negative, got {}",
                self.convergence_threshold
            )));
        }
        if self.scout_step_floor <= 0.0 {
            return Err(CfError::Config(format!(
                "scout_step_floor must be positive, got {}",
                self.scout_step_floor
            )));
        }
        if let ScoutStep::Randomized { min, max } = self.scout_step {
            if min > max || min < 0.0 {
                return Err(CfError::Config(format!(
                    "randomized scout step range [{min}, {max}] is invalid"
                )));
            }
        }
        if self.candidate_pool == 0 {
            return Err(CfError::Config("candidate_pool must be at least 1".into()));
        }
        if self.settle_secs < 0.0 {
            return Err(CfError::Config(format!(
                "settle_secs must be non-negative, got {}",
                self.settle_secs
            )));
        }
        self.initial_rates.validate()?;
        if self.initial_rates.sum() == 0.0 {
            return Err(CfError::Config(
                "initial_rates must have a positive total flow".into(),
            ));
        }
        Ok(())
    }
}

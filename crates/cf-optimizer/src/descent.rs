//! Scout-step gradient descent over the rate simplex.
//!
//! Implemented as an ask/tell state machine: the orchestrator asks for the
//! next action, performs the actuation and measurement it describes, and
//! tells the result back. The machine itself never touches hardware, which
//! keeps the real-step loop testable against synthetic cost landscapes.
//!
//! Phases: INIT -> EVALUATE -> {CONVERGED | SCOUT -> RESCALE -> EVALUATE},
//! bounded by the iteration budget (MAX_ITER is a terminal, non-error
//! state). Abortion is imposed from outside by the orchestrator's
//! cancellation handling and never appears here.

use tracing::debug;

use cf_types::{CfError, CfResult, Color, ExperimentConfig, RateVector, ScoutStep, CHANNEL_COUNT};

use crate::scaler::scale_rates;
use crate::scout::{accumulate_gradient, effective_step_size, scout_plan, ScoutSample};
use crate::state::OptimizationState;

/// Terminal states of the descent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cost fell below the convergence threshold.
    Converged,
    /// Iteration budget exhausted without convergence. Not an error.
    MaxIterations,
}

/// What the orchestrator should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum DescentAction {
    /// Actuate these rates, settle, measure: one real step.
    Measure(RateVector),
    /// Actuate this single-channel perturbation and measure: one scout step.
    MeasureScout { index: usize, rates: RateVector },
    /// The loop is over; stop the pumps.
    Finished(StopReason),
}

#[derive(Debug)]
enum Phase {
    Evaluate,
    Scout {
        base_cost: f64,
        plans: [RateVector; CHANNEL_COUNT],
        samples: Vec<ScoutSample>,
    },
    Finished(StopReason),
}

/// The gradient-descent optimizer for one experiment run.
pub struct GradientDescent {
    target: Color,
    total_rate: f64,
    learning_rate: f64,
    convergence_threshold: f64,
    max_iterations: usize,
    scout_step: ScoutStep,
    scout_step_floor: f64,
    state: OptimizationState,
    phase: Phase,
}

impl GradientDescent {
    pub fn new(target: Color, config: &ExperimentConfig) -> Self {
        Self {
            target,
            total_rate: config.total_rate,
            learning_rate: config.learning_rate,
            convergence_threshold: config.convergence_threshold,
            max_iterations: config.max_iterations,
            scout_step: config.scout_step,
            scout_step_floor: config.scout_step_floor,
            state: OptimizationState::new(config.initial_rates),
            phase: Phase::Evaluate,
        }
    }

    /// Read-only view of the iteration state for reporting.
    pub fn state(&self) -> &OptimizationState {
        &self.state
    }

    /// The next actuation/measurement the loop needs, or a terminal state.
    pub fn next_action(&mut self) -> DescentAction {
        match &self.phase {
            Phase::Evaluate => {
                if self.state.iterations >= self.max_iterations {
                    self.phase = Phase::Finished(StopReason::MaxIterations);
                    DescentAction::Finished(StopReason::MaxIterations)
                } else {
                    DescentAction::Measure(self.state.current_rates)
                }
            }
            Phase::Scout { plans, samples, .. } => {
                let index = samples.len();
                DescentAction::MeasureScout {
                    index,
                    rates: plans[index],
                }
            }
            Phase::Finished(reason) => DescentAction::Finished(*reason),
        }
    }

    /// Report the cost of a completed real-step measurement.
    pub fn report_measurement(&mut self, cost: f64) -> CfResult<()> {
        if !matches!(self.phase, Phase::Evaluate) {
            return Err(CfError::InvalidInput(
                "real-step measurement reported outside the EVALUATE phase".into(),
            ));
        }

        self.state.record(cost, self.state.current_rates);

        if cost < self.convergence_threshold {
            debug!(cost, "gradient descent converged");
            self.phase = Phase::Finished(StopReason::Converged);
            return Ok(());
        }
        if self.state.iterations >= self.max_iterations {
            // No point scouting for a real step we will never take.
            self.phase = Phase::Finished(StopReason::MaxIterations);
            return Ok(());
        }

        let step = effective_step_size(self.scout_step, self.scout_step_floor);
        let plans = scout_plan(&self.state.current_rates, step);
        debug!(step, iteration = self.state.iterations, "scout plans ready");
        self.phase = Phase::Scout {
            base_cost: cost,
            plans,
            samples: Vec::with_capacity(CHANNEL_COUNT),
        };
        Ok(())
    }

    /// Report one completed scout measurement. After the fourth sample the
    /// accumulated gradient is rescaled onto the simplex and becomes the
    /// next real-step rates.
    pub fn report_scout(&mut self, sample: ScoutSample) -> CfResult<()> {
        let Phase::Scout {
            base_cost,
            plans: _,
            samples,
        } = &mut self.phase
        else {
            return Err(CfError::InvalidInput(
                "scout measurement reported outside the SCOUT phase".into(),
            ));
        };

        samples.push(sample);
        if samples.len() < CHANNEL_COUNT {
            return Ok(());
        }

        let delta = accumulate_gradient(
            &self.target,
            samples,
            &self.state.current_rates,
            *base_cost,
            self.learning_rate,
        )?;
        let next = scale_rates(
            &self.state.current_rates,
            &RateVector::new(delta),
            self.total_rate,
        )?;
        debug!(rates = %next, "rescaled next real-step rates");
        self.state.current_rates = next;
        self.phase = Phase::Evaluate;
        Ok(())
    }
}

//! The experiment worker loop.
//!
//! One orchestrator owns the actuator and sensor exclusively for the
//! duration of a run and executes the whole optimization sequentially:
//! gradient descent alone, Bayesian optimization alone, or both in strict
//! per-iteration alternation on the shared hardware (never concurrently).
//! Suspension points are exactly the post-actuation settle wait and the
//! measurement; the cancellation token is polled at the top of each.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use cf_optimizer::descent::{DescentAction, GradientDescent, StopReason};
use cf_optimizer::{boundary_region, cost, ConstrainedBayes, ScoutSample};
use cf_rig::{Actuator, Sensor};
use cf_types::{
    CfResult, Color, ExperimentConfig, ExperimentSummary, ProgressRecord, RateVector, RunId,
    RunOutcome, StrategyKind, WarningCategory, WarningRecord,
};

use crate::cancel::CancelToken;
use crate::report::ReportQueues;

/// Which strategies the run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    GradientDescent,
    Bayesian,
    Both,
}

/// Drives one experiment run against a physical or simulated rig.
pub struct Orchestrator<A: Actuator, S: Sensor> {
    actuator: A,
    sensor: S,
    target: Color,
    config: ExperimentConfig,
    mode: RunMode,
    run_id: RunId,
    cancel: CancelToken,
    queues: ReportQueues,
}

impl<A: Actuator, S: Sensor> Orchestrator<A, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: Color,
        config: ExperimentConfig,
        mode: RunMode,
        actuator: A,
        sensor: S,
        cancel: CancelToken,
        queues: ReportQueues,
    ) -> CfResult<Self> {
        config.validate()?;
        target.validate()?;
        Ok(Self {
            actuator,
            sensor,
            target,
            config,
            mode,
            run_id: Uuid::new_v4(),
            cancel,
            queues,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Execute the run to completion (converged, out of budget, cancelled,
    /// or failed). Whatever happens, the pumps are commanded to stop before
    /// this returns.
    pub async fn run(mut self) -> CfResult<ExperimentSummary> {
        info!(
            run_id = %self.run_id,
            mode = ?self.mode,
            target = %self.target,
            max_iterations = self.config.max_iterations,
            "experiment started"
        );

        let result = self.drive().await;

        if let Err(err) = self.actuator.stop().await {
            error!(error = %err, "failed to stop pumps at end of run");
        }

        match &result {
            Ok(summary) => info!(run_id = %self.run_id, outcome = ?summary.outcome, "experiment finished"),
            Err(err) => error!(run_id = %self.run_id, error = %err, "experiment failed"),
        }
        result
    }

    async fn drive(&mut self) -> CfResult<ExperimentSummary> {
        let mut gd = matches!(self.mode, RunMode::GradientDescent | RunMode::Both)
            .then(|| GradientDescent::new(self.target.clone(), &self.config));
        let mut bo = matches!(self.mode, RunMode::Bayesian | RunMode::Both)
            .then(|| ConstrainedBayes::new(&self.config));

        let mut outcome = RunOutcome::MaxIterations;

        'run: for iteration in 0..self.config.max_iterations {
            // Bayesian real step first, as on the original rig.
            if let Some(bo) = bo.as_mut() {
                let proposal = bo.propose();
                // The acquisition samples the raw box and does not enforce
                // the total-flow constraint; project every proposal onto the
                // simplex before it touches hardware or the surrogate.
                let rates = proposal.normalized_to(self.config.total_rate)?;
                let Some((cost, color)) = self.measure(&rates).await? else {
                    outcome = RunOutcome::Aborted;
                    break 'run;
                };
                self.warn_on_regression(bo.state().prev_cost, cost);
                bo.register(rates, cost);
                self.publish(StrategyKind::Bayesian, iteration, cost, color, rates);
            }

            // Gradient-descent real step plus its four scouts.
            if let Some(gd) = gd.as_mut() {
                match gd.next_action() {
                    DescentAction::Finished(reason) => {
                        if reason == StopReason::Converged {
                            outcome = RunOutcome::Converged;
                        }
                        break 'run;
                    }
                    DescentAction::Measure(rates) => {
                        let Some((cost, color)) = self.measure(&rates).await? else {
                            outcome = RunOutcome::Aborted;
                            break 'run;
                        };
                        self.warn_on_regression(gd.state().prev_cost, cost);
                        self.warn_on_boundary(&color);
                        gd.report_measurement(cost)?;
                        self.publish(StrategyKind::GradientDescent, iteration, cost, color, rates);

                        loop {
                            match gd.next_action() {
                                DescentAction::MeasureScout { index, rates } => {
                                    let Some((cost, color)) = self.measure(&rates).await? else {
                                        outcome = RunOutcome::Aborted;
                                        break 'run;
                                    };
                                    debug!(index, cost, rates = %rates, "scout step");
                                    gd.report_scout(ScoutSample { rates, color })?;
                                }
                                DescentAction::Finished(reason) => {
                                    if reason == StopReason::Converged {
                                        outcome = RunOutcome::Converged;
                                    }
                                    break 'run;
                                }
                                // The next real step belongs to the next
                                // iteration of the outer loop.
                                DescentAction::Measure(_) => break,
                            }
                        }
                    }
                    DescentAction::MeasureScout { .. } => {
                        unreachable!("scouts are always drained within the iteration that planned them")
                    }
                }
            }
        }

        if outcome == RunOutcome::Aborted {
            info!(run_id = %self.run_id, "experiment aborted by cancellation");
        }

        let mut strategies = Vec::new();
        if let Some(gd) = &gd {
            strategies.push(gd.state().summary(StrategyKind::GradientDescent));
        }
        if let Some(bo) = &bo {
            strategies.push(bo.state().summary(StrategyKind::Bayesian));
        }
        Ok(ExperimentSummary {
            run_id: self.run_id,
            outcome,
            strategies,
        })
    }

    /// One actuate-settle-measure cycle. Returns `None` if the cancellation
    /// token was observed at either suspension point.
    async fn measure(&mut self, rates: &RateVector) -> CfResult<Option<(f64, Color)>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        rates.validate()?;
        self.actuator.set_rates(rates).await?;
        self.actuator.start().await?;

        let settle = Duration::from_secs_f64(self.config.settle_secs);
        if !settle.is_zero() {
            debug!(rates = %rates, settle_secs = self.config.settle_secs, "settling");
            tokio::time::sleep(settle).await;
        }
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let color = self.sensor.measure().await?;
        color.validate()?;
        let measured_cost = cost(&self.target, &color)?;
        Ok(Some((measured_cost, color)))
    }

    fn warn_on_regression(&self, prev_cost: Option<f64>, cost: f64) {
        if regression_exceeded(prev_cost, cost, self.config.regression_margin) {
            self.queues.push_warning(WarningRecord {
                category: WarningCategory::Regression,
                message: "Cost increased sharply. Check for bubbles stuck in the flow cell.".into(),
            });
        }
    }

    /// Boundary warnings fire on gradient-descent real steps only: the
    /// Bayesian sampler visits saturating corners of the simplex routinely
    /// and on purpose.
    fn warn_on_boundary(&self, color: &Color) {
        if let Some(region) = boundary_region(color, &self.config.boundary) {
            debug!(?region, color = %color, "measured color in boundary region");
            self.queues.push_warning(WarningRecord {
                category: WarningCategory::Boundary,
                message: "The mix is reaching a color-space boundary; it may not converge further."
                    .into(),
            });
        }
    }

    fn publish(
        &self,
        strategy: StrategyKind,
        iteration: usize,
        cost: f64,
        color: Color,
        rates: RateVector,
    ) {
        info!(
            run_id = %self.run_id,
            %strategy,
            iteration,
            cost,
            color = %color,
            rates = %rates,
            "real step complete"
        );
        self.queues.push_progress(ProgressRecord {
            run_id: self.run_id,
            strategy,
            iteration,
            cost,
            color,
            rates,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// A regression is a cost increase above `margin` over the previous real
/// step. The first real step never regresses, and near-zero previous costs
/// are ignored (a fresh run starts from an uninformative baseline).
fn regression_exceeded(prev_cost: Option<f64>, cost: f64, margin: f64) -> bool {
    match prev_cost {
        Some(prev) => prev > 1.0 && cost - prev > margin,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_needs_a_previous_step() {
        assert!(!regression_exceeded(None, 50_000.0, 3_000.0));
    }

    #[test]
    fn regression_requires_margin_exceeded() {
        assert!(!regression_exceeded(Some(2_000.0), 4_999.0, 3_000.0));
        assert!(regression_exceeded(Some(2_000.0), 5_001.0, 3_000.0));
    }

    #[test]
    fn near_zero_baseline_is_ignored() {
        assert!(!regression_exceeded(Some(0.5), 10_000.0, 3_000.0));
    }
}

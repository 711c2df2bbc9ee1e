//! Per-strategy iteration state.

use cf_types::{RateVector, StrategyKind, StrategySummary};

/// Lowest cost observed so far and the rates that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestObservation {
    pub cost: f64,
    pub rates: RateVector,
}

/// Mutable state a single strategy threads through its iterations. Owned
/// exclusively by the strategy that mutates it; the orchestrator only reads
/// summaries for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationState {
    /// Rates the strategy wants actuated on its next real step.
    pub current_rates: RateVector,
    /// Completed real-step measurements.
    pub iterations: usize,
    /// Cost of the previous real step, for regression detection. `None`
    /// until the first real step completes.
    pub prev_cost: Option<f64>,
    pub best: Option<BestObservation>,
}

impl OptimizationState {
    pub fn new(initial_rates: RateVector) -> Self {
        Self {
            current_rates: initial_rates,
            iterations: 0,
            prev_cost: None,
            best: None,
        }
    }

    /// Record one completed real-step measurement at `rates`.
    pub fn record(&mut self, cost: f64, rates: RateVector) {
        self.iterations += 1;
        if self.best.map_or(true, |b| cost < b.cost) {
            self.best = Some(BestObservation { cost, rates });
        }
        self.prev_cost = Some(cost);
    }

    pub fn summary(&self, strategy: StrategyKind) -> StrategySummary {
        StrategySummary {
            strategy,
            iterations: self.iterations,
            best_cost: self.best.map(|b| b.cost),
            best_rates: self.best.map(|b| b.rates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_tracks_minimum_not_latest() {
        let mut state = OptimizationState::new(RateVector::uniform(600.0));
        state.record(500.0, RateVector::new([100.0, 200.0, 200.0, 100.0]));
        state.record(120.0, RateVector::new([50.0, 250.0, 250.0, 50.0]));
        state.record(900.0, RateVector::new([150.0, 150.0, 150.0, 150.0]));

        let best = state.best.unwrap();
        assert_eq!(best.cost, 120.0);
        assert_eq!(best.rates, RateVector::new([50.0, 250.0, 250.0, 50.0]));
        assert_eq!(state.iterations, 3);
        assert_eq!(state.prev_cost, Some(900.0));
    }

    #[test]
    fn summary_of_fresh_state_is_empty() {
        let state = OptimizationState::new(RateVector::uniform(600.0));
        let summary = state.summary(StrategyKind::Bayesian);
        assert_eq!(summary.iterations, 0);
        assert!(summary.best_cost.is_none());
        assert!(summary.best_rates.is_none());
    }
}

//! Run events published for external consumption (logging, UI, alerting).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::Color;
use crate::rates::RateVector;

/// Unique identifier for one experiment run.
pub type RunId = Uuid;

/// Which optimization strategy produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    GradientDescent,
    Bayesian,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GradientDescent => write!(f, "gd"),
            Self::Bayesian => write!(f, "bo"),
        }
    }
}

/// One completed real-step measurement, pushed onto the progress queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub run_id: RunId,
    pub strategy: StrategyKind,
    pub iteration: usize,
    pub cost: f64,
    pub color: Color,
    pub rates: RateVector,
    pub timestamp: DateTime<Utc>,
}

/// Non-fatal condition worth telling the operator about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    /// Cost rose sharply over the previous real-step (check for trapped
    /// bubbles in the flow cell).
    Regression,
    /// Measured color entered a saturating region of color space.
    Boundary,
}

/// Warning/informational record, pushed onto the warning queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub category: WarningCategory,
    pub message: String,
}

/// Why an experiment run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Gradient descent reached the convergence threshold.
    Converged,
    /// The iteration budget was exhausted. Not an error.
    MaxIterations,
    /// The cancellation token was observed. Not an error.
    Aborted,
}

/// Best-known result for one strategy at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy: StrategyKind,
    /// Real-step iterations actually completed.
    pub iterations: usize,
    /// Lowest cost observed, if any real-step completed.
    pub best_cost: Option<f64>,
    /// Rates that produced `best_cost`.
    pub best_rates: Option<RateVector>,
}

/// Final report for one experiment run. The per-strategy bests are exposed
/// regardless of the final iteration's own cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub strategies: Vec<StrategySummary>,
}

impl ExperimentSummary {
    pub fn strategy(&self, kind: StrategyKind) -> Option<&StrategySummary> {
        self.strategies.iter().find(|s| s.strategy == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_tags_are_short() {
        assert_eq!(StrategyKind::GradientDescent.to_string(), "gd");
        assert_eq!(StrategyKind::Bayesian.to_string(), "bo");
    }

    #[test]
    fn progress_record_serializes() {
        let record = ProgressRecord {
            run_id: Uuid::new_v4(),
            strategy: StrategyKind::Bayesian,
            iteration: 3,
            cost: 812.5,
            color: Color::rgb(120.0, 85.0, 200.0),
            rates: RateVector::new([100.0, 200.0, 250.0, 50.0]),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"bayesian\""));
        let back: ProgressRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn summary_lookup_by_strategy() {
        let summary = ExperimentSummary {
            run_id: Uuid::new_v4(),
            outcome: RunOutcome::MaxIterations,
            strategies: vec![StrategySummary {
                strategy: StrategyKind::GradientDescent,
                iterations: 12,
                best_cost: Some(423.0),
                best_rates: Some(RateVector::uniform(600.0)),
            }],
        };
        assert!(summary.strategy(StrategyKind::GradientDescent).is_some());
        assert!(summary.strategy(StrategyKind::Bayesian).is_none());
    }
}

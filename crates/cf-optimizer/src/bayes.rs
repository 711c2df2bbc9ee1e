//! Constrained Bayesian optimization over the rate simplex.
//!
//! The surrogate is deliberately lightweight: an RBF-weighted interpolation
//! of past observations with a distance-driven uncertainty term, scored by
//! an upper-confidence-bound acquisition. Proposals are drawn from the raw
//! `[0, total]^4` box; the acquisition does not itself enforce the
//! total-flow equality constraint, so the orchestrator must renormalize
//! every proposal onto the simplex before it is actuated or registered.

use rand::Rng;
use tracing::debug;

use cf_types::{ExperimentConfig, RateVector, CHANNEL_COUNT};

use crate::state::OptimizationState;

/// Probabilistic belief about the (negated) cost function, accumulated over
/// one experiment run. Never shared between concurrent strategies.
#[derive(Debug, Clone)]
pub struct SurrogateModel {
    /// (rates, negated cost) pairs; negated because the acquisition
    /// maximizes.
    observations: Vec<(RateVector, f64)>,
    /// RBF kernel length scale, in rate units.
    length_scale: f64,
}

impl SurrogateModel {
    pub fn new(length_scale: f64) -> Self {
        Self {
            observations: Vec::new(),
            length_scale,
        }
    }

    pub fn observe(&mut self, rates: RateVector, target: f64) {
        self.observations.push((rates, target));
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Predicted mean and uncertainty at `rates`.
    ///
    /// The mean is a kernel-weighted average of observed targets; the
    /// uncertainty scales with the distance to the nearest observation,
    /// normalized so it spans the observed target spread.
    pub fn predict(&self, rates: &RateVector) -> (f64, f64) {
        if self.observations.is_empty() {
            return (0.0, 1.0);
        }

        let mut weight_sum = 0.0;
        let mut weighted_target = 0.0;
        let mut max_weight: f64 = 0.0;
        for (obs_rates, target) in &self.observations {
            let mut dist_sq = 0.0;
            for i in 0..CHANNEL_COUNT {
                let d = rates[i] - obs_rates[i];
                dist_sq += d * d;
            }
            let weight = (-dist_sq / (self.length_scale * self.length_scale)).exp();
            weight_sum += weight;
            weighted_target += weight * target;
            max_weight = max_weight.max(weight);
        }

        let targets: Vec<f64> = self.observations.iter().map(|(_, t)| *t).collect();
        let prior = targets.iter().sum::<f64>() / targets.len() as f64;
        let spread = targets
            .iter()
            .fold(f64::NEG_INFINITY, |a, t| a.max(*t))
            - targets.iter().fold(f64::INFINITY, |a, t| a.min(*t));

        let mean = if weight_sum > 1e-12 {
            weighted_target / weight_sum
        } else {
            prior
        };
        // Far from every observation max_weight -> 0 and sigma -> full
        // spread; on top of an observation sigma -> 0.
        let sigma = spread.max(1.0) * (1.0 - max_weight);
        (mean, sigma)
    }
}

/// Bayesian optimizer over rate-to-cost observations, subject (via the
/// orchestrator's renormalization) to the total-flow equality constraint.
pub struct ConstrainedBayes {
    surrogate: SurrogateModel,
    state: OptimizationState,
    total_rate: f64,
    kappa: f64,
    candidate_pool: usize,
    initial_rates: RateVector,
    proposed_initial: bool,
}

impl ConstrainedBayes {
    pub fn new(config: &ExperimentConfig) -> Self {
        Self {
            // A quarter of the total flow is a reasonable neighborhood size
            // on a simplex of this scale.
            surrogate: SurrogateModel::new(config.total_rate / 4.0),
            state: OptimizationState::new(config.initial_rates),
            total_rate: config.total_rate,
            kappa: config.kappa,
            candidate_pool: config.candidate_pool,
            initial_rates: config.initial_rates,
            proposed_initial: false,
        }
    }

    pub fn state(&self) -> &OptimizationState {
        &self.state
    }

    pub fn surrogate(&self) -> &SurrogateModel {
        &self.surrogate
    }

    /// Next candidate rates to evaluate. The first call returns the
    /// configured initial vector; afterwards the acquisition argmax over a
    /// random candidate pool. Proposals are RAW box samples and must be
    /// renormalized to the simplex by the caller before actuation or
    /// registration.
    pub fn propose(&mut self) -> RateVector {
        if !self.proposed_initial {
            self.proposed_initial = true;
            return self.initial_rates;
        }

        let mut rng = rand::thread_rng();
        let mut best_rates = RateVector::uniform(self.total_rate);
        let mut best_score = f64::NEG_INFINITY;
        for _ in 0..self.candidate_pool {
            let candidate = RateVector::new(std::array::from_fn(|_| {
                rng.gen_range(0.0..=self.total_rate)
            }));
            let (mean, sigma) = self.surrogate.predict(&candidate);
            let score = mean + self.kappa * sigma;
            if score > best_score {
                best_score = score;
                best_rates = candidate;
            }
        }
        debug!(score = best_score, rates = %best_rates, "acquisition argmax");
        best_rates
    }

    /// Register a completed measurement at `rates`. The cost is negated on
    /// the way into the surrogate because the acquisition maximizes.
    pub fn register(&mut self, rates: RateVector, cost: f64) {
        self.surrogate.observe(rates, -cost);
        self.state.current_rates = rates;
        self.state.record(cost, rates);
    }
}

//! # cf-optimizer
//!
//! Rate-space optimization for the ChromaFlow mixing rig.
//!
//! Provides the cost model, the simplex projection used to keep proposed
//! rate updates physically feasible, scout-step gradient estimation, the
//! gradient-descent real-step state machine, and the constrained Bayesian
//! optimizer with its surrogate model. Everything here is pure computation:
//! actuation and measurement belong to the orchestrator in `cf-engine`.

mod bayes;
mod boundary;
mod cost;
mod scaler;
mod scout;
mod state;

pub mod descent;

pub use bayes::{ConstrainedBayes, SurrogateModel};
pub use boundary::{boundary_region, BoundaryRegion};
pub use cost::cost;
pub use descent::{DescentAction, GradientDescent, StopReason};
pub use scaler::scale_rates;
pub use scout::{accumulate_gradient, effective_step_size, scout_plan, GradientEstimate, ScoutSample};
pub use state::{BestObservation, OptimizationState};

//! # cf-rig
//!
//! Hardware boundary for the ChromaFlow mixing rig. Defines the abstract
//! [`Actuator`] and [`Sensor`] contracts the optimization core is written
//! against, and provides a fully in-process simulated rig ([`sim_rig`]) for
//! development and integration testing.

mod hardware;
mod sim;

pub use hardware::{Actuator, RigError, RigResult, Sensor};
pub use sim::{sim_rig, SimActuator, SimCommand, SimProbe, SimRigConfig, SimSensor};

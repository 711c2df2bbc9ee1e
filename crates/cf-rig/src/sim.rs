//! In-process simulated rig.
//!
//! Mixes four configured stock colors by flow-weighted average, with
//! optional measurement noise and fault injection. Useful for strategy
//! development, integration testing, and exercising the orchestrator's
//! cancellation and error paths without hardware.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use cf_types::{Color, RateVector, CHANNEL_COUNT};

use crate::hardware::{Actuator, RigError, RigResult, Sensor};

/// Configuration for the simulated rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRigConfig {
    /// Pure color of each channel's stock solution, in pump order
    /// (cyan, magenta, water, yellow).
    pub stock_colors: [[f64; 3]; CHANNEL_COUNT],
    /// Half-width of the uniform measurement noise added per channel.
    pub noise: f64,
}

impl Default for SimRigConfig {
    fn default() -> Self {
        Self {
            stock_colors: [
                [0.0, 255.0, 255.0],   // cyan
                [255.0, 0.0, 255.0],   // magenta
                [255.0, 255.0, 255.0], // water
                [255.0, 255.0, 0.0],   // yellow
            ],
            noise: 0.0,
        }
    }
}

/// One actuation command, recorded for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    SetRates(RateVector),
    Start,
    Stop,
}

#[derive(Debug)]
struct SimState {
    config: SimRigConfig,
    rates: Option<RateVector>,
    running: bool,
    history: Vec<SimCommand>,
    sensor_fault: Option<String>,
    actuator_fault: Option<String>,
}

/// Actuator half of the simulated rig.
#[derive(Debug, Clone)]
pub struct SimActuator {
    state: Arc<Mutex<SimState>>,
}

/// Sensor half of the simulated rig.
#[derive(Debug, Clone)]
pub struct SimSensor {
    state: Arc<Mutex<SimState>>,
}

/// Inspection handle for tests: command history, running flag, fault
/// injection.
#[derive(Debug, Clone)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

/// Build a simulated rig, returning its actuator and sensor halves plus an
/// inspection probe.
pub fn sim_rig(config: SimRigConfig) -> (SimActuator, SimSensor, SimProbe) {
    let state = Arc::new(Mutex::new(SimState {
        config,
        rates: None,
        running: false,
        history: Vec::new(),
        sensor_fault: None,
        actuator_fault: None,
    }));
    (
        SimActuator {
            state: Arc::clone(&state),
        },
        SimSensor {
            state: Arc::clone(&state),
        },
        SimProbe { state },
    )
}

impl SimProbe {
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn last_rates(&self) -> Option<RateVector> {
        self.state.lock().rates
    }

    pub fn history(&self) -> Vec<SimCommand> {
        self.state.lock().history.clone()
    }

    /// Make the next (and every later) measurement fail.
    pub fn inject_sensor_fault(&self, message: impl Into<String>) {
        self.state.lock().sensor_fault = Some(message.into());
    }

    /// Make every later actuation command fail.
    pub fn inject_actuator_fault(&self, message: impl Into<String>) {
        self.state.lock().actuator_fault = Some(message.into());
    }
}

#[async_trait]
impl Actuator for SimActuator {
    async fn set_rates(&mut self, rates: &RateVector) -> RigResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = &state.actuator_fault {
            return Err(RigError::Actuator {
                message: message.clone(),
            });
        }
        state.rates = Some(*rates);
        state.history.push(SimCommand::SetRates(*rates));
        Ok(())
    }

    async fn start(&mut self) -> RigResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = &state.actuator_fault {
            return Err(RigError::Actuator {
                message: message.clone(),
            });
        }
        state.running = true;
        state.history.push(SimCommand::Start);
        Ok(())
    }

    async fn stop(&mut self) -> RigResult<()> {
        // Stop must always succeed so cancellation can leave the rig safe,
        // even with an injected actuator fault.
        let mut state = self.state.lock();
        state.running = false;
        state.history.push(SimCommand::Stop);
        info!("simulated pumps stopped");
        Ok(())
    }
}

#[async_trait]
impl Sensor for SimSensor {
    async fn measure(&mut self) -> RigResult<Color> {
        let state = self.state.lock();
        if let Some(message) = &state.sensor_fault {
            return Err(RigError::Sensor {
                message: message.clone(),
            });
        }
        if !state.running {
            return Err(RigError::NotRunning);
        }
        let rates = state.rates.ok_or(RigError::NotConnected)?;
        let sum = rates.sum();
        if sum <= 0.0 {
            return Err(RigError::Sensor {
                message: format!("no flow through the cell at rates {rates}"),
            });
        }

        let mut channels = vec![0.0; 3];
        for (stock, rate) in state.config.stock_colors.iter().zip(rates.iter()) {
            for (c, s) in channels.iter_mut().zip(stock) {
                *c += s * rate / sum;
            }
        }
        if state.config.noise > 0.0 {
            let mut rng = rand::thread_rng();
            for c in &mut channels {
                *c += rng.gen_range(-state.config.noise..=state.config.noise);
            }
        }
        Ok(Color { channels }.clamped())
    }
}

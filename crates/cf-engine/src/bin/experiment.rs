//! Demo experiment run against the in-process simulated rig.
//!
//! Configuration is read from the JSON file named by `CHROMAFLOW_CONFIG`
//! (defaults apply when unset). The target color comes from
//! `CHROMAFLOW_TARGET` as `r,g,b` and defaults to a blue-leaning mix.

use tracing_subscriber::EnvFilter;

use cf_engine::{report_channels, spawn_consumer, CancelToken, Orchestrator, RunMode, TracingSink};
use cf_rig::{sim_rig, SimRigConfig};
use cf_types::{CfError, Color, ExperimentConfig};

fn load_config() -> anyhow::Result<ExperimentConfig> {
    match std::env::var("CHROMAFLOW_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        Err(_) => Ok(ExperimentConfig {
            // The simulator settles instantly; no need for the physical
            // diffusion wait.
            settle_secs: 0.0,
            ..Default::default()
        }),
    }
}

fn load_target() -> anyhow::Result<Color> {
    let raw = std::env::var("CHROMAFLOW_TARGET").unwrap_or_else(|_| "140,150,230".to_string());
    let channels: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CfError::InvalidInput(format!("bad CHROMAFLOW_TARGET {raw:?}: {e}")))?;
    if channels.len() != 3 {
        return Err(CfError::InvalidInput(format!(
            "CHROMAFLOW_TARGET needs three channels, got {}",
            channels.len()
        ))
        .into());
    }
    Ok(Color { channels })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = load_config()?;
    let target = load_target()?;

    let (queues, receivers) = report_channels(cf_engine::DEFAULT_QUEUE_CAPACITY);
    let consumer = spawn_consumer(receivers, TracingSink, cf_engine::DEFAULT_POLL_INTERVAL);

    let (actuator, sensor, _probe) = sim_rig(SimRigConfig::default());
    let cancel = CancelToken::new();

    let orchestrator = Orchestrator::new(
        target,
        config,
        RunMode::Both,
        actuator,
        sensor,
        cancel,
        queues,
    )?;
    let summary = orchestrator.run().await?;

    consumer.await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

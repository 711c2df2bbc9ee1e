//! End-to-end runs against the simulated rig.

use cf_engine::{report_channels, CancelToken, Orchestrator, RunMode};
use cf_rig::{sim_rig, SimCommand, SimProbe, SimRigConfig};
use cf_types::{
    CfError, Color, ExperimentConfig, ExperimentSummary, ProgressRecord, RunOutcome, StrategyKind,
};

/// Config tuned for the simulator: no physical diffusion wait.
fn sim_config() -> ExperimentConfig {
    ExperimentConfig {
        settle_secs: 0.0,
        ..Default::default()
    }
}

/// The color the default simulated rig produces at the default initial
/// rates (uniform 150s): the mean of the four stock colors.
fn initial_mix_color() -> Color {
    Color::rgb(191.25, 191.25, 191.25)
}

struct Run {
    summary: ExperimentSummary,
    progress: Vec<ProgressRecord>,
    probe: SimProbe,
}

async fn run_experiment(
    target: Color,
    config: ExperimentConfig,
    mode: RunMode,
    cancel: CancelToken,
) -> Result<Run, CfError> {
    let (queues, receivers) = report_channels(64);
    let (actuator, sensor, probe) = sim_rig(SimRigConfig::default());
    let orchestrator =
        Orchestrator::new(target, config, mode, actuator, sensor, cancel, queues)?;
    let summary = orchestrator.run().await?;
    let progress: Vec<ProgressRecord> = receivers.progress.try_iter().collect();
    Ok(Run {
        summary,
        progress,
        probe,
    })
}

#[tokio::test]
async fn immediate_convergence_skips_scouts() {
    // The target is exactly what the initial rates produce: the very first
    // real step costs zero and the run converges without a single scout.
    let run = run_experiment(
        initial_mix_color(),
        sim_config(),
        RunMode::GradientDescent,
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.summary.outcome, RunOutcome::Converged);
    assert_eq!(run.progress.len(), 1);
    assert_eq!(run.progress[0].strategy, StrategyKind::GradientDescent);
    assert_eq!(run.progress[0].cost, 0.0);

    let gd = run.summary.strategy(StrategyKind::GradientDescent).unwrap();
    assert_eq!(gd.iterations, 1);
    assert_eq!(gd.best_cost, Some(0.0));

    // Exactly one actuation (the real step), then the shutdown stop.
    let set_rates = run
        .probe
        .history()
        .iter()
        .filter(|c| matches!(c, SimCommand::SetRates(_)))
        .count();
    assert_eq!(set_rates, 1);
    assert!(!run.probe.is_running());
}

#[tokio::test]
async fn precancelled_run_aborts_before_touching_the_pumps() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let run = run_experiment(
        Color::rgb(0.0, 0.0, 200.0),
        sim_config(),
        RunMode::GradientDescent,
        cancel,
    )
    .await
    .unwrap();

    assert_eq!(run.summary.outcome, RunOutcome::Aborted);
    assert!(run.progress.is_empty());

    let gd = run.summary.strategy(StrategyKind::GradientDescent).unwrap();
    assert_eq!(gd.iterations, 0);
    assert!(gd.best_cost.is_none());

    // The only command ever issued is the final safety stop.
    assert_eq!(run.probe.history(), vec![SimCommand::Stop]);
    assert!(!run.probe.is_running());
}

#[tokio::test]
async fn both_mode_alternates_bayesian_then_descent() {
    let config = ExperimentConfig {
        max_iterations: 2,
        // Cost is never negative, so the descent side cannot converge and
        // both strategies run the full budget.
        convergence_threshold: 0.0,
        ..sim_config()
    };

    let run = run_experiment(
        Color::rgb(0.0, 0.0, 200.0),
        config,
        RunMode::Both,
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.summary.outcome, RunOutcome::MaxIterations);

    let tags: Vec<(StrategyKind, usize)> = run
        .progress
        .iter()
        .map(|r| (r.strategy, r.iteration))
        .collect();
    assert_eq!(
        tags,
        vec![
            (StrategyKind::Bayesian, 0),
            (StrategyKind::GradientDescent, 0),
            (StrategyKind::Bayesian, 1),
            (StrategyKind::GradientDescent, 1),
        ]
    );

    // Every actuated rate vector sat on the simplex, including the
    // renormalized Bayesian proposals.
    for record in &run.progress {
        assert!(
            record.rates.is_feasible(600.0, 1e-6),
            "off-simplex rates {} from {}",
            record.rates,
            record.strategy
        );
    }

    for kind in [StrategyKind::Bayesian, StrategyKind::GradientDescent] {
        let summary = run.summary.strategy(kind).unwrap();
        assert_eq!(summary.iterations, 2);
        assert!(summary.best_cost.is_some());
        assert!(summary.best_rates.is_some());
    }
    assert!(!run.probe.is_running());
}

#[tokio::test]
async fn bayesian_mode_runs_to_budget() {
    let config = ExperimentConfig {
        max_iterations: 3,
        ..sim_config()
    };

    let run = run_experiment(
        Color::rgb(120.0, 140.0, 220.0),
        config,
        RunMode::Bayesian,
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.summary.outcome, RunOutcome::MaxIterations);
    assert_eq!(run.progress.len(), 3);
    assert!(run
        .progress
        .iter()
        .all(|r| r.strategy == StrategyKind::Bayesian));

    let bo = run.summary.strategy(StrategyKind::Bayesian).unwrap();
    assert_eq!(bo.iterations, 3);
    let best = bo.best_cost.unwrap();
    assert!(run.progress.iter().all(|r| r.cost >= best));
}

#[tokio::test]
async fn sensor_fault_fails_the_run_but_stops_the_pumps() {
    let (queues, _receivers) = report_channels(64);
    let (actuator, sensor, probe) = sim_rig(SimRigConfig::default());
    probe.inject_sensor_fault("lamp failure");

    let orchestrator = Orchestrator::new(
        Color::rgb(0.0, 0.0, 200.0),
        sim_config(),
        RunMode::GradientDescent,
        actuator,
        sensor,
        CancelToken::new(),
        queues,
    )
    .unwrap();

    let err = orchestrator.run().await.unwrap_err();
    match err {
        CfError::Rig(message) => assert!(message.contains("lamp failure")),
        other => panic!("expected a rig fault, got {other:?}"),
    }
    assert!(!probe.is_running());
}

#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let (queues, _receivers) = report_channels(64);
    let (actuator, sensor, _probe) = sim_rig(SimRigConfig::default());

    let config = ExperimentConfig {
        max_iterations: 0,
        ..sim_config()
    };
    let result = Orchestrator::new(
        Color::rgb(0.0, 0.0, 200.0),
        config,
        RunMode::GradientDescent,
        actuator,
        sensor,
        CancelToken::new(),
        queues,
    );
    assert!(matches!(result, Err(CfError::Config(_))));
}

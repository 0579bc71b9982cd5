//! Batch behaviour of the orchestrator with scripted evaluators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use async_trait::async_trait;
use skyview_engine::{
    DirectionEvaluator, DirectionJob, DirectionPlan, DirectionState, EngineConfig,
    EvaluationError, LocalEvaluator, Orchestrator, SkyviewService,
};
use skyview_geom::{AngularRange, Mesh, ObstructionResult, ValidationMode};
use skyview_ir::{BatchStatus, ObstructionRequest, ReasonCode};
use skyview_math::{DirectionAngle, Point3};

fn observer() -> Point3 {
    Point3::new(0.0, 3.0, 0.0)
}

/// A wall 10 units away along +Z, 5 units high.
fn wall_at_plus_z() -> Arc<Mesh> {
    let triples = [[[-5.0, 0.0, 10.0], [5.0, 0.0, 10.0], [0.0, 5.0, 10.0]]];
    Arc::new(
        Mesh::from_vertex_triples(&triples, ValidationMode::Strict)
            .unwrap()
            .mesh,
    )
}

/// A wall 10 units away along +Z, 40 wide and 10 high.
fn broad_wall_at_plus_z() -> Arc<Mesh> {
    let triples = [
        [[-20.0, 0.0, 10.0], [20.0, 0.0, 10.0], [20.0, 10.0, 10.0]],
        [[-20.0, 0.0, 10.0], [20.0, 10.0, 10.0], [-20.0, 10.0, 10.0]],
    ];
    Arc::new(
        Mesh::from_vertex_triples(&triples, ValidationMode::Strict)
            .unwrap()
            .mesh,
    )
}

/// A mesh large enough that one local evaluation takes many milliseconds.
fn dense_mesh(count: usize) -> Arc<Mesh> {
    let triples: Vec<[[f64; 3]; 3]> = (0..count)
        .map(|i| {
            let z = i as f64 * 0.01;
            [[10.0, 0.0, z], [10.0, 0.0, z + 0.005], [10.0, 5.0, z]]
        })
        .collect();
    Arc::new(
        Mesh::from_vertex_triples(&triples, ValidationMode::Strict)
            .unwrap()
            .mesh,
    )
}

/// Eight directions at 45 degree steps.
fn compass_config() -> Arc<EngineConfig> {
    Arc::new(EngineConfig {
        range: AngularRange::new(0.0, 315.0).unwrap(),
        ..Default::default()
    })
}

/// Fails every direction at the given azimuth.
struct FlakyEvaluator {
    fail_at: f64,
}

#[async_trait]
impl DirectionEvaluator for FlakyEvaluator {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        if (job.angle.degrees() - self.fail_at).abs() < 1e-9 {
            return Err(EvaluationError::Transport("connection reset".into()));
        }
        LocalEvaluator::new().evaluate(job).await
    }
}

/// Sleeps longer for lower azimuths so completion order is reversed.
struct ReversingEvaluator;

#[async_trait]
impl DirectionEvaluator for ReversingEvaluator {
    fn name(&self) -> &str {
        "reversing"
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        let delay = (360.0 - job.angle.degrees()) / 10.0;
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        LocalEvaluator::new().evaluate(job).await
    }
}

/// Hangs on the given azimuth.
struct StallingEvaluator {
    stall_at: f64,
}

#[async_trait]
impl DirectionEvaluator for StallingEvaluator {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        if (job.angle.degrees() - self.stall_at).abs() < 1e-9 {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        LocalEvaluator::new().evaluate(job).await
    }
}

/// Records the highest number of evaluations running at once.
#[derive(Default)]
struct CountingEvaluator {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

#[async_trait]
impl DirectionEvaluator for CountingEvaluator {
    fn name(&self) -> &str {
        "counting"
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        LocalEvaluator::new().evaluate(job).await
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Never finishes; tracks how many evaluations are still alive.
#[derive(Default)]
struct HangingEvaluator {
    live: Arc<AtomicUsize>,
    started: AtomicUsize,
}

#[async_trait]
impl DirectionEvaluator for HangingEvaluator {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn evaluate(&self, _job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        let _guard = LiveGuard(Arc::clone(&self.live));
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ObstructionResult::UNOBSTRUCTED)
    }
}

/// Panics on the given azimuth.
struct PanickingEvaluator {
    panic_at: f64,
}

#[async_trait]
impl DirectionEvaluator for PanickingEvaluator {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        if (job.angle.degrees() - self.panic_at).abs() < 1e-9 {
            panic!("evaluator bug");
        }
        LocalEvaluator::new().evaluate(job).await
    }
}

#[tokio::test]
async fn test_eight_directions_with_one_failure() {
    let orch = Orchestrator::new(
        compass_config(),
        Arc::new(FlakyEvaluator { fail_at: 180.0 }),
    )
    .unwrap();

    let result = orch
        .run(observer(), wall_at_plus_z(), &DirectionPlan::Count(8))
        .await
        .unwrap();

    assert_eq!(result.len(), 8);
    assert_eq!(result.status(), BatchStatus::PartialFailure);
    assert_eq!(result.successes(), 7);

    let failed = &result.entries[4];
    assert_eq!(failed.sample.angle, 180.0);
    assert_eq!(failed.state, DirectionState::Failed);
    assert_eq!(
        failed.outcome.as_ref().unwrap_err().reason(),
        ReasonCode::EvaluationTransport
    );

    // Only the direction facing the wall is obstructed
    for (i, entry) in result.entries.iter().enumerate() {
        assert_eq!(entry.sample.index, i);
        assert_relative_eq!(entry.sample.angle, i as f64 * 45.0, epsilon = 1e-9);
        let Ok(r) = &entry.outcome else { continue };
        assert_eq!(entry.state, DirectionState::Succeeded);
        assert_relative_eq!(r.horizon_angle + r.zenith_angle, 90.0, epsilon = 1e-9);
        if i == 2 {
            assert_relative_eq!(r.horizon_angle, 11.309932474020215, epsilon = 1e-6);
        } else {
            assert_eq!(r.horizon_angle, 0.0);
        }
    }
}

#[tokio::test]
async fn test_default_range_peak_near_ninety() {
    let config = Arc::new(EngineConfig::default());
    let planner = Orchestrator::local(Arc::clone(&config)).unwrap();
    let samples = planner.samples(&DirectionPlan::Count(8)).unwrap();
    assert_eq!(samples[0].angle, 17.5);
    assert_eq!(samples[7].angle, 162.5);

    let orch = Orchestrator::new(
        config,
        Arc::new(FlakyEvaluator {
            fail_at: samples[1].angle,
        }),
    )
    .unwrap();
    let result = orch
        .run(observer(), broad_wall_at_plus_z(), &DirectionPlan::Count(8))
        .await
        .unwrap();

    assert_eq!(result.len(), 8);
    assert_eq!(result.status(), BatchStatus::PartialFailure);
    for (i, entry) in result.entries.iter().enumerate() {
        assert_eq!(entry.sample.index, i);
        assert!(entry.state.is_terminal());
    }

    let failed = &result.entries[1];
    assert_eq!(failed.state, DirectionState::Failed);
    assert_eq!(
        failed.outcome.as_ref().unwrap_err().reason(),
        ReasonCode::EvaluationTransport
    );

    let horizon = |i: usize| result.entries[i].outcome.as_ref().unwrap().horizon_angle;
    assert_relative_eq!(horizon(0), 0.0, epsilon = 1e-9);
    assert_relative_eq!(horizon(7), 0.0, epsilon = 1e-9);

    let peak = (0..8)
        .filter(|&i| result.entries[i].is_success())
        .max_by(|&a, &b| horizon(a).total_cmp(&horizon(b)))
        .unwrap();
    assert!(peak == 3 || peak == 4, "peak at index {peak}");
    assert!(horizon(peak) > 30.0);
}

#[tokio::test]
async fn test_local_timeout_fires_during_slow_evaluation() {
    let config = Arc::new(EngineConfig {
        evaluation_timeout_ms: 1,
        ..Default::default()
    });
    let orch = Orchestrator::local(config).unwrap();
    let mesh = dense_mesh(400_000);

    let started = Instant::now();
    let result = orch
        .run(observer(), mesh, &DirectionPlan::Count(4))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.len(), 4);
    assert_eq!(result.status(), BatchStatus::PartialFailure);
    for entry in &result.entries {
        assert_eq!(entry.state, DirectionState::TimedOut);
        assert_eq!(
            entry.outcome.as_ref().unwrap_err().reason(),
            ReasonCode::EvaluationTimeout
        );
    }
    assert!(elapsed < Duration::from_secs(1), "batch took {elapsed:?}");
}

#[tokio::test]
async fn test_results_ordered_by_index_regardless_of_completion() {
    let orch = Orchestrator::new(compass_config(), Arc::new(ReversingEvaluator)).unwrap();
    let result = orch
        .run(observer(), wall_at_plus_z(), &DirectionPlan::Count(8))
        .await
        .unwrap();

    assert_eq!(result.status(), BatchStatus::Success);
    let samples = orch.samples(&DirectionPlan::Count(8)).unwrap();
    for (entry, sample) in result.entries.iter().zip(&samples) {
        assert_eq!(entry.sample, *sample);
    }
    let horizon = result.entries[2].outcome.as_ref().unwrap().horizon_angle;
    assert_relative_eq!(horizon, 11.309932474020215, epsilon = 1e-6);
}

#[tokio::test]
async fn test_timeout_is_recorded_per_direction() {
    let config = Arc::new(EngineConfig {
        range: AngularRange::new(0.0, 315.0).unwrap(),
        evaluation_timeout_ms: 50,
        ..Default::default()
    });
    let orch = Orchestrator::new(config, Arc::new(StallingEvaluator { stall_at: 90.0 })).unwrap();

    let result = orch
        .run(observer(), wall_at_plus_z(), &DirectionPlan::Count(8))
        .await
        .unwrap();

    assert_eq!(result.status(), BatchStatus::PartialFailure);
    assert_eq!(result.failures(), 1);
    let stalled = &result.entries[2];
    assert_eq!(stalled.state, DirectionState::TimedOut);
    assert_eq!(
        stalled.outcome,
        Err(EvaluationError::Timeout(Duration::from_millis(50)))
    );
}

#[tokio::test]
async fn test_concurrency_bound_is_honoured() {
    let config = Arc::new(EngineConfig {
        max_concurrency: Some(3),
        ..Default::default()
    });
    let evaluator = Arc::new(CountingEvaluator::default());
    let orch = Orchestrator::new(config, evaluator.clone()).unwrap();

    let result = orch
        .run(observer(), wall_at_plus_z(), &DirectionPlan::Count(12))
        .await
        .unwrap();

    assert_eq!(result.status(), BatchStatus::Success);
    assert_eq!(result.len(), 12);
    let max = evaluator.max_seen.load(Ordering::SeqCst);
    assert!(max >= 1 && max <= 3, "max in flight was {max}");
    assert_eq!(evaluator.current.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_batch_cancels_evaluations() {
    let evaluator = Arc::new(HangingEvaluator::default());
    let orch = Orchestrator::new(compass_config(), evaluator.clone()).unwrap();

    let plan = DirectionPlan::Count(8);
    let run = orch.run(observer(), wall_at_plus_z(), &plan);
    let outcome = tokio::time::timeout(Duration::from_millis(100), run).await;
    assert!(outcome.is_err());

    // Let the runtime drop the aborted tasks
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(evaluator.started.load(Ordering::SeqCst), 8);
    assert_eq!(evaluator.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_evaluation_is_a_failure() {
    let orch = Orchestrator::new(
        compass_config(),
        Arc::new(PanickingEvaluator { panic_at: 45.0 }),
    )
    .unwrap();

    let result = orch
        .run(observer(), wall_at_plus_z(), &DirectionPlan::Count(8))
        .await
        .unwrap();

    assert_eq!(result.len(), 8);
    assert_eq!(result.failures(), 1);
    let lost = &result.entries[1];
    assert_eq!(lost.state, DirectionState::Failed);
    assert_eq!(
        lost.outcome.as_ref().unwrap_err().reason(),
        ReasonCode::EvaluationCancelled
    );
}

#[tokio::test]
async fn test_single_direction_matches_batch_of_one() {
    let service = SkyviewService::default();
    let request = ObstructionRequest {
        x: 0.0,
        y: 3.0,
        z: 0.0,
        direction_angle: 90.0,
        mesh: vec![vec![[-5.0, 0.0, 10.0], [5.0, 0.0, 10.0], [0.0, 5.0, 10.0]]],
        validation: None,
    };
    let single = service.handle_obstruction(&request).unwrap();

    let orch = Orchestrator::local(Arc::new(EngineConfig::default())).unwrap();
    let plan = DirectionPlan::Explicit(vec![DirectionAngle::new(90.0).unwrap()]);
    let batch = orch.run(observer(), wall_at_plus_z(), &plan).await.unwrap();

    assert_eq!(batch.len(), 1);
    let r = batch.entries[0].outcome.as_ref().unwrap();
    assert_eq!(r.horizon_angle, single.horizon_angle);
    assert_eq!(r.zenith_angle, single.zenith_angle);
}

#[tokio::test]
async fn test_zero_directions_rejected_before_evaluation() {
    let evaluator = Arc::new(CountingEvaluator::default());
    let orch = Orchestrator::new(compass_config(), evaluator.clone()).unwrap();
    let err = orch
        .run(observer(), wall_at_plus_z(), &DirectionPlan::Count(0))
        .await
        .unwrap_err();
    assert_eq!(err.reason(), ReasonCode::InvalidSampleCount);
    assert_eq!(evaluator.max_seen.load(Ordering::SeqCst), 0);
}

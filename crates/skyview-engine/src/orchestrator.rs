//! Parallel evaluation of many viewing directions.
//!
//! A batch samples its directions, hands each one to a
//! [`DirectionEvaluator`] under a concurrency bound and a per-direction
//! timeout, and collects every outcome at its sample index. One failing
//! direction never fails the batch; it is recorded and the batch reports
//! [`BatchStatus::PartialFailure`].
//!
//! Evaluations run as tasks in a [`JoinSet`] owned by [`Orchestrator::run`].
//! Dropping the `run` future drops the set, which aborts every task still in
//! flight.

use std::sync::Arc;

use skyview_geom::{DirectionSample, DirectionSampler, GeomError, Mesh, ObstructionResult};
use skyview_ir::BatchStatus;
use skyview_math::{DirectionAngle, Point3};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EvaluationError, Result};
use crate::evaluator::{DirectionEvaluator, DirectionJob, LocalEvaluator};

/// Which directions a batch evaluates.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DirectionPlan {
    /// The configured default count over the configured range.
    #[default]
    Default,
    /// `n` evenly spaced directions over the configured range.
    Count(usize),
    /// Exactly these directions, in this order.
    Explicit(Vec<DirectionAngle>),
}

/// Lifecycle of a single direction within a batch.
///
/// `Pending -> InFlight -> {Succeeded, Failed, TimedOut}`. Terminal states
/// are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionState {
    /// Not yet handed to the evaluator.
    Pending,
    /// Evaluation running.
    InFlight,
    /// A result was produced.
    Succeeded,
    /// The evaluator reported an error, or the task was lost.
    Failed,
    /// The evaluation exceeded its timeout.
    TimedOut,
}

impl DirectionState {
    /// Whether this state is final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DirectionState::Succeeded | DirectionState::Failed | DirectionState::TimedOut
        )
    }

    /// Attempt a transition, returning the resulting state.
    ///
    /// Illegal transitions leave the state unchanged.
    pub fn advance(self, next: DirectionState) -> DirectionState {
        let allowed = match (self, next) {
            (DirectionState::Pending, DirectionState::InFlight) => true,
            // Directions whose angle is rejected never start
            (DirectionState::Pending, DirectionState::Failed) => true,
            (DirectionState::InFlight, n) => n.is_terminal(),
            _ => false,
        };
        if allowed {
            next
        } else {
            warn!(from = ?self, to = ?next, "ignoring illegal direction state transition");
            self
        }
    }

    fn for_outcome(outcome: &std::result::Result<ObstructionResult, EvaluationError>) -> Self {
        match outcome {
            Ok(_) => DirectionState::Succeeded,
            Err(EvaluationError::Timeout(_)) => DirectionState::TimedOut,
            Err(_) => DirectionState::Failed,
        }
    }
}

/// Final record for one direction of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionOutcome {
    /// The sampled direction, including its result index.
    pub sample: DirectionSample,
    /// Terminal state reached.
    pub state: DirectionState,
    /// Result or reason for failure.
    pub outcome: std::result::Result<ObstructionResult, EvaluationError>,
}

impl DirectionOutcome {
    /// Whether this direction produced a result.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// All outcomes of a batch, ordered by sample index.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    /// One entry per requested direction; `entries[i].sample.index == i`.
    pub entries: Vec<DirectionOutcome>,
}

impl AggregatedResult {
    /// `Success` when every direction succeeded, `PartialFailure` otherwise.
    pub fn status(&self) -> BatchStatus {
        if self.entries.iter().all(DirectionOutcome::is_success) {
            BatchStatus::Success
        } else {
            BatchStatus::PartialFailure
        }
    }

    /// Number of directions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful directions.
    pub fn successes(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }

    /// Number of failed or timed-out directions.
    pub fn failures(&self) -> usize {
        self.len() - self.successes()
    }
}

/// Runs multi-direction batches against a [`DirectionEvaluator`].
pub struct Orchestrator {
    config: Arc<EngineConfig>,
    sampler: DirectionSampler,
    evaluator: Arc<dyn DirectionEvaluator>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("sampler", &self.sampler)
            .field("evaluator", &self.evaluator.name())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator. Fails if the configuration is invalid.
    pub fn new(config: Arc<EngineConfig>, evaluator: Arc<dyn DirectionEvaluator>) -> Result<Self> {
        config.validate()?;
        let sampler = DirectionSampler::new(config.range)?;
        Ok(Self {
            config,
            sampler,
            evaluator,
        })
    }

    /// Orchestrator that evaluates in-process.
    pub fn local(config: Arc<EngineConfig>) -> Result<Self> {
        Self::new(config, Arc::new(LocalEvaluator::new()))
    }

    /// The shared configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The evaluator directions are sent to.
    pub fn evaluator(&self) -> &dyn DirectionEvaluator {
        self.evaluator.as_ref()
    }

    /// Directions a plan expands to.
    ///
    /// Counts above the configured `max_num_directions` are rejected before
    /// anything is allocated.
    pub fn samples(&self, plan: &DirectionPlan) -> Result<Vec<DirectionSample>> {
        match plan {
            DirectionPlan::Default => Ok(self.sampler.sample(self.config.default_num_directions)?),
            DirectionPlan::Count(n) => {
                self.config.check_direction_count(*n)?;
                Ok(self.sampler.sample(*n)?)
            }
            DirectionPlan::Explicit(angles) if angles.is_empty() => {
                Err(GeomError::InvalidSampleCount(0).into())
            }
            DirectionPlan::Explicit(angles) => {
                self.config.check_direction_count(angles.len())?;
                Ok(angles
                    .iter()
                    .enumerate()
                    .map(|(index, angle)| DirectionSample {
                        angle: angle.degrees(),
                        index,
                    })
                    .collect())
            }
        }
    }

    /// Evaluate every direction of `plan` from `observer`.
    ///
    /// Returns an error only when the plan itself is invalid. Individual
    /// direction failures land in the aggregated result.
    pub async fn run(
        &self,
        observer: Point3,
        mesh: Arc<Mesh>,
        plan: &DirectionPlan,
    ) -> Result<AggregatedResult> {
        let samples = self.samples(plan)?;
        let n = samples.len();
        let limit = self.config.concurrency_limit(n);
        let timeout = self.config.evaluation_timeout();

        info!(
            directions = n,
            concurrency = limit,
            timeout_ms = timeout.as_millis() as u64,
            evaluator = self.evaluator.name(),
            triangles = mesh.len(),
            "starting obstruction batch"
        );

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut states = vec![DirectionState::Pending; n];
        let mut outcomes: Vec<Option<std::result::Result<ObstructionResult, EvaluationError>>> =
            (0..n).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for sample in &samples {
            let index = sample.index;
            let angle = match sample.direction() {
                Ok(angle) => angle,
                Err(e) => {
                    states[index] = states[index].advance(DirectionState::Failed);
                    outcomes[index] = Some(Err(GeomError::from(e).into()));
                    continue;
                }
            };

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    states[index] = states[index].advance(DirectionState::Failed);
                    outcomes[index] = Some(Err(EvaluationError::Cancelled(e.to_string())));
                    continue;
                }
            };

            states[index] = states[index].advance(DirectionState::InFlight);
            let evaluator = Arc::clone(&self.evaluator);
            let job = DirectionJob {
                observer,
                angle,
                mesh: Arc::clone(&mesh),
            };

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = match tokio::time::timeout(timeout, evaluator.evaluate(&job)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(EvaluationError::Timeout(timeout)),
                };
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    debug!(index, ok = outcome.is_ok(), "direction finished");
                    states[index] = states[index].advance(DirectionState::for_outcome(&outcome));
                    outcomes[index] = Some(outcome);
                }
                // The lost index is still InFlight and is swept up below
                Err(e) => warn!("direction task did not complete: {e}"),
            }
        }

        let mut entries = Vec::with_capacity(n);
        for ((sample, state), outcome) in samples.into_iter().zip(states).zip(outcomes) {
            let (state, outcome) = match outcome {
                Some(outcome) => (state, outcome),
                None => (
                    state.advance(DirectionState::Failed),
                    Err(EvaluationError::Cancelled(
                        "evaluation task did not complete".into(),
                    )),
                ),
            };
            if let Err(e) = &outcome {
                warn!(
                    index = sample.index,
                    direction = sample.angle,
                    reason = %e.reason(),
                    "direction failed: {e}"
                );
            }
            entries.push(DirectionOutcome {
                sample,
                state,
                outcome,
            });
        }

        let result = AggregatedResult { entries };
        info!(
            directions = n,
            succeeded = result.successes(),
            failed = result.failures(),
            status = ?result.status(),
            "obstruction batch finished"
        );
        Ok(result)
    }
}

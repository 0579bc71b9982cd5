//! The direction evaluator capability and its in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use skyview_geom::{compute_obstruction, Mesh, ObstructionResult};
use skyview_math::{DirectionAngle, Point3};

use crate::error::EvaluationError;

/// Everything needed to evaluate one direction.
///
/// The mesh is shared read-only between all jobs of a batch.
#[derive(Debug, Clone)]
pub struct DirectionJob {
    /// Observer position.
    pub observer: Point3,
    /// Viewing azimuth.
    pub angle: DirectionAngle,
    /// Obstruction mesh.
    pub mesh: Arc<Mesh>,
}

/// Evaluates obstruction for a single direction, locally or remotely.
///
/// The orchestrator depends only on this trait, so evaluators can be mixed
/// or swapped without touching batch logic.
#[async_trait]
pub trait DirectionEvaluator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Evaluate one direction.
    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError>;
}

/// Evaluates directions in-process with the geometry pipeline.
///
/// The computation runs on tokio's blocking pool, so the caller's future
/// stays responsive: a timeout around [`DirectionEvaluator::evaluate`]
/// fires on schedule, and dropping the future stops waiting for the
/// result. A computation already running finishes in the background and
/// its result is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEvaluator;

impl LocalEvaluator {
    /// Create a local evaluator.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectionEvaluator for LocalEvaluator {
    fn name(&self) -> &str {
        "local"
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        let job = job.clone();
        tokio::task::spawn_blocking(move || {
            compute_obstruction(job.observer, job.angle, &job.mesh)
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                EvaluationError::Cancelled("local evaluation panicked".into())
            } else {
                EvaluationError::Cancelled(e.to_string())
            }
        })
    }
}

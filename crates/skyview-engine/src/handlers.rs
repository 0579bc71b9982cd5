//! Query entry points operating on wire types.
//!
//! Every handler validates its request completely before any geometry work
//! starts, and reports rejection as an [`EngineError`] whose
//! [`EngineError::to_response`] is the wire error body.

use std::sync::Arc;

use skyview_geom::{GeomError, MeshBuild, ObstructionQuery};
use skyview_ir::{
    AllResponse, DirectionEntry, HorizonResponse, ObstructionRequest, ObstructionResponse,
    ParallelRequest, ParallelResponse, ServiceState, ServiceStatus, ZenithResponse,
};
use skyview_math::{DirectionAngle, Point3};
use tracing::debug;

use crate::config::EngineConfig;
use crate::convert::{mesh_from_wire, observer_from_wire, response_from_result, validation_mode};
use crate::error::{EngineError, Result};
use crate::evaluator::{DirectionEvaluator, LocalEvaluator};
use crate::orchestrator::{AggregatedResult, DirectionPlan, Orchestrator};
use crate::remote::RemoteEvaluator;

/// Name reported by [`SkyviewService::status`].
pub const SERVICE_NAME: &str = "skyview";

/// Request handlers sharing one read-only configuration.
#[derive(Debug, Clone, Default)]
pub struct SkyviewService {
    config: Arc<EngineConfig>,
}

/// A validated single-direction request.
struct Prepared {
    observer: Point3,
    angle: DirectionAngle,
    build: MeshBuild,
}

impl SkyviewService {
    /// Create a service. Fails if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The shared configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Service identification and state.
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            name: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: ServiceState::Running,
        }
    }

    fn prepare(&self, req: &ObstructionRequest) -> Result<Prepared> {
        let observer = observer_from_wire(req.x, req.y, req.z)?;
        let angle = DirectionAngle::new(req.direction_angle).map_err(GeomError::from)?;
        let mode = validation_mode(req.validation, self.config.validation);
        let build = mesh_from_wire(&req.mesh, mode)?;
        Ok(Prepared {
            observer,
            angle,
            build,
        })
    }

    /// Horizon and zenith angles for one direction.
    pub fn handle_obstruction(&self, req: &ObstructionRequest) -> Result<ObstructionResponse> {
        let p = self.prepare(req)?;
        let query = ObstructionQuery::new(p.observer, p.angle, &p.build.mesh);
        Ok(response_from_result(query.result()))
    }

    /// Horizon angle for one direction.
    pub fn handle_horizon(&self, req: &ObstructionRequest) -> Result<HorizonResponse> {
        let p = self.prepare(req)?;
        let query = ObstructionQuery::new(p.observer, p.angle, &p.build.mesh);
        Ok(HorizonResponse {
            horizon_angle: query.horizon_angle(),
        })
    }

    /// Zenith angle for one direction.
    pub fn handle_zenith(&self, req: &ObstructionRequest) -> Result<ZenithResponse> {
        let p = self.prepare(req)?;
        let query = ObstructionQuery::new(p.observer, p.angle, &p.build.mesh);
        Ok(ZenithResponse {
            zenith_angle: query.zenith_angle(),
        })
    }

    /// Both angles plus pipeline diagnostics for one direction.
    pub fn handle_all(&self, req: &ObstructionRequest) -> Result<AllResponse> {
        let p = self.prepare(req)?;
        let query = ObstructionQuery::new(p.observer, p.angle, &p.build.mesh);
        let diag = query.diagnostics();
        Ok(AllResponse {
            horizon_angle: query.horizon_angle(),
            zenith_angle: query.zenith_angle(),
            direction_angle: p.angle.degrees(),
            total_triangles: diag.total_triangles,
            filtered_triangles: diag.filtered_triangles,
            intersected_triangles: diag.intersected_triangles,
            skipped_triangles: p.build.skipped.len(),
            nearest_obstruction_distance: diag.nearest_obstruction_distance,
        })
    }

    /// Evaluate many directions concurrently.
    ///
    /// Explicit `directions` take precedence over `num_directions`. A remote
    /// evaluator is used when the request or the configuration names a
    /// target.
    pub async fn handle_parallel(&self, req: &ParallelRequest) -> Result<ParallelResponse> {
        let observer = observer_from_wire(req.x, req.y, req.z)?;
        let plan = plan_for(req, &self.config)?;
        let mode = validation_mode(req.validation, self.config.validation);
        let build = mesh_from_wire(&req.mesh, mode)?;

        let orchestrator = Orchestrator::new(Arc::clone(&self.config), self.evaluator_for(req)?)?;
        debug!(evaluator = orchestrator.evaluator().name(), "parallel query");

        let result = orchestrator
            .run(observer, Arc::new(build.mesh), &plan)
            .await?;
        Ok(parallel_response(&result))
    }

    fn evaluator_for(&self, req: &ParallelRequest) -> Result<Arc<dyn DirectionEvaluator>> {
        let target = req
            .direction_evaluator_target
            .as_deref()
            .or(self.config.remote_target.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match target {
            Some(target) => {
                let remote = RemoteEvaluator::new(target, self.config.evaluation_timeout())
                    .map_err(|e| EngineError::Validation(e.to_string()))?;
                Ok(Arc::new(remote))
            }
            None => Ok(Arc::new(LocalEvaluator::new())),
        }
    }
}

fn plan_for(req: &ParallelRequest, config: &EngineConfig) -> Result<DirectionPlan> {
    if let Some(directions) = &req.directions {
        config.check_direction_count(directions.len())?;
        let angles = directions
            .iter()
            .map(|&d| DirectionAngle::new(d))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(GeomError::from)?;
        return Ok(DirectionPlan::Explicit(angles));
    }
    Ok(match req.num_directions {
        Some(n) => {
            config.check_direction_count(n)?;
            DirectionPlan::Count(n)
        }
        None => DirectionPlan::Default,
    })
}

/// Wire form of a batch result.
pub fn parallel_response(result: &AggregatedResult) -> ParallelResponse {
    let results = result
        .entries
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(r) => DirectionEntry::success(
                entry.sample.index,
                entry.sample.angle,
                response_from_result(*r),
            ),
            Err(e) => {
                DirectionEntry::failed(entry.sample.index, entry.sample.angle, e.to_failure())
            }
        })
        .collect();

    ParallelResponse {
        status: result.status(),
        num_directions: result.len(),
        results,
    }
}

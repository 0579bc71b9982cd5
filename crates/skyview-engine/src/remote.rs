//! Direction evaluation delegated to a remote compute peer over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use skyview_geom::ObstructionResult;
use skyview_ir::{ErrorResponse, MeshValidation, ObstructionRequest, ObstructionResponse};
use tracing::debug;

use crate::convert::{mesh_to_wire, result_from_response};
use crate::error::EvaluationError;
use crate::evaluator::{DirectionEvaluator, DirectionJob};

/// Path of the single-direction endpoint on a peer.
pub const OBSTRUCTION_PATH: &str = "/obstruction";

/// Sends each direction to a peer's single-direction endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEvaluator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteEvaluator {
    /// Create an evaluator for the peer at `base_url`.
    ///
    /// `timeout` bounds each HTTP exchange; the orchestrator applies its own
    /// per-direction timeout on top.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EvaluationError> {
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(EvaluationError::Transport(format!(
                "evaluator target must be an http(s) URL, got {base_url:?}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EvaluationError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{base}{OBSTRUCTION_PATH}"),
            timeout,
        })
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_for(job: &DirectionJob) -> ObstructionRequest {
        ObstructionRequest {
            x: job.observer.x,
            y: job.observer.y,
            z: job.observer.z,
            direction_angle: job.angle.degrees(),
            mesh: mesh_to_wire(&job.mesh),
            // Already validated on this side
            validation: Some(MeshValidation::Strict),
        }
    }
}

#[async_trait]
impl DirectionEvaluator for RemoteEvaluator {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn evaluate(&self, job: &DirectionJob) -> Result<ObstructionResult, EvaluationError> {
        let request = Self::request_for(job);
        debug!(endpoint = %self.endpoint, direction = job.angle.degrees(), "remote evaluation");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            let parsed: ObstructionResponse = serde_json::from_slice(&body).map_err(|e| {
                EvaluationError::Transport(format!("invalid response from peer: {e}"))
            })?;
            return Ok(result_from_response(parsed));
        }

        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(err) => Err(EvaluationError::Remote {
                reason: err.reason,
                message: err.message,
            }),
            Err(_) => Err(EvaluationError::Transport(format!("peer returned HTTP {status}"))),
        }
    }
}

impl RemoteEvaluator {
    fn transport_error(&self, e: reqwest::Error) -> EvaluationError {
        if e.is_timeout() {
            EvaluationError::Timeout(self.timeout)
        } else {
            EvaluationError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use skyview_geom::{Mesh, ValidationMode};
    use skyview_math::{DirectionAngle, Point3};

    fn job() -> DirectionJob {
        let triples = [[[10.0, 0.0, -5.0], [10.0, 0.0, 5.0], [10.0, 5.0, 0.0]]];
        DirectionJob {
            observer: Point3::new(0.0, 3.0, 0.0),
            angle: DirectionAngle::new(400.0).unwrap(),
            mesh: Arc::new(
                Mesh::from_vertex_triples(&triples, ValidationMode::Strict)
                    .unwrap()
                    .mesh,
            ),
        }
    }

    #[test]
    fn test_endpoint_normalized() {
        let e = RemoteEvaluator::new("http://peer:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(e.endpoint(), "http://peer:8000/obstruction");
        assert_eq!(e.name(), "http://peer:8000/obstruction");
    }

    #[test]
    fn test_rejects_non_http_target() {
        let err = RemoteEvaluator::new("peer:8000", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, EvaluationError::Transport(_)));
    }

    #[test]
    fn test_request_shape() {
        let req = RemoteEvaluator::request_for(&job());
        assert_eq!(req.y, 3.0);
        assert_eq!(req.direction_angle, 40.0);
        assert_eq!(req.mesh.len(), 1);
        assert_eq!(req.mesh[0].len(), 3);
        assert_eq!(req.validation, Some(MeshValidation::Strict));
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_transport_error() {
        // Bind then drop a listener so the port is known to be closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let evaluator =
            RemoteEvaluator::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = evaluator.evaluate(&job()).await.unwrap_err();
        assert!(
            matches!(err, EvaluationError::Transport(_) | EvaluationError::Timeout(_)),
            "unexpected error: {err:?}"
        );
    }
}

#![warn(missing_docs)]

//! Wire format for skyview obstruction queries.
//!
//! These are the request and response shapes exchanged with callers and
//! with remote compute peers. They are plain serde structs with no
//! geometry semantics; validation and conversion into core types happen in
//! the engine. Angles are always degrees.

use serde::{Deserialize, Serialize};

/// One triangle on the wire: must hold exactly three `[x, y, z]` triples.
///
/// Kept as a `Vec` so that wrong arity is reported as a validation error
/// with the offending index instead of an opaque parse failure.
pub type TriangleWire = Vec<[f64; 3]>;

/// A flat list of triangles.
pub type MeshWire = Vec<TriangleWire>;

/// Mesh validation policy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshValidation {
    /// Reject the request if any triangle is degenerate.
    Strict,
    /// Skip degenerate triangles.
    Lenient,
}

/// Single-direction query (also used for horizon-only, zenith-only, and
/// combined queries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstructionRequest {
    /// Observer X.
    pub x: f64,
    /// Observer Y (up).
    pub y: f64,
    /// Observer Z.
    pub z: f64,
    /// Viewing azimuth in degrees.
    pub direction_angle: f64,
    /// Obstruction triangles.
    #[serde(default)]
    pub mesh: MeshWire,
    /// Optional override of the configured validation policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<MeshValidation>,
}

impl ObstructionRequest {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Both angles for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstructionResponse {
    /// Elevation of the highest obstruction, degrees.
    pub horizon_angle: f64,
    /// Angle from the zenith to the highest obstruction, degrees.
    pub zenith_angle: f64,
}

/// Horizon-only response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonResponse {
    /// Elevation of the highest obstruction, degrees.
    pub horizon_angle: f64,
}

/// Zenith-only response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZenithResponse {
    /// Angle from the zenith to the highest obstruction, degrees.
    pub zenith_angle: f64,
}

/// Combined response with diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllResponse {
    /// Elevation of the highest obstruction, degrees.
    pub horizon_angle: f64,
    /// Angle from the zenith to the highest obstruction, degrees.
    pub zenith_angle: f64,
    /// Canonical azimuth actually evaluated, `[0, 360)`.
    pub direction_angle: f64,
    /// Triangles accepted into the mesh.
    pub total_triangles: usize,
    /// Triangles in front of the observer.
    pub filtered_triangles: usize,
    /// Triangles met by the viewing plane.
    pub intersected_triangles: usize,
    /// Triangles dropped by lenient validation.
    pub skipped_triangles: usize,
    /// Distance to the first triangle on the horizontal line of sight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_obstruction_distance: Option<f64>,
}

/// Multi-direction query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelRequest {
    /// Observer X.
    pub x: f64,
    /// Observer Y (up).
    pub y: f64,
    /// Observer Z.
    pub z: f64,
    /// Obstruction triangles.
    #[serde(default)]
    pub mesh: MeshWire,
    /// Number of evenly sampled directions (configured default if absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_directions: Option<usize>,
    /// Explicit azimuths; takes precedence over `num_directions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<Vec<f64>>,
    /// Base URL of a remote compute peer; evaluated locally if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_evaluator_target: Option<String>,
    /// Optional override of the configured validation policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<MeshValidation>,
}

impl ParallelRequest {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Overall outcome of a multi-direction query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every direction succeeded.
    Success,
    /// At least one direction failed; the rest are still reported.
    PartialFailure,
}

/// Stable machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Malformed or missing input.
    ValidationError,
    /// Degenerate triangle rejected in strict mode.
    DegenerateGeometry,
    /// Fewer than one direction requested.
    InvalidSampleCount,
    /// A directional evaluation exceeded its timeout.
    EvaluationTimeout,
    /// A remote evaluation could not be delivered or decoded.
    EvaluationTransport,
    /// The evaluation was cancelled before finishing.
    EvaluationCancelled,
    /// Unexpected internal failure.
    Internal,
}

impl ReasonCode {
    /// The wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::ValidationError => "validation_error",
            ReasonCode::DegenerateGeometry => "degenerate_geometry",
            ReasonCode::InvalidSampleCount => "invalid_sample_count",
            ReasonCode::EvaluationTimeout => "evaluation_timeout",
            ReasonCode::EvaluationTransport => "evaluation_transport",
            ReasonCode::EvaluationCancelled => "evaluation_cancelled",
            ReasonCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure with a stable code and a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Stable code.
    pub reason: ReasonCode,
    /// Description for humans.
    pub message: String,
}

/// Error body returned for a rejected request.
pub type ErrorResponse = Failure;

/// One direction in a multi-direction response.
///
/// Exactly one of the angle pair or `failure` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionEntry {
    /// Position in the result array.
    pub index: usize,
    /// Azimuth evaluated, degrees.
    pub direction_angle: f64,
    /// Horizon angle when the direction succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_angle: Option<f64>,
    /// Zenith angle when the direction succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zenith_angle: Option<f64>,
    /// Failure details when the direction did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl DirectionEntry {
    /// A successful entry.
    pub fn success(index: usize, direction_angle: f64, result: ObstructionResponse) -> Self {
        Self {
            index,
            direction_angle,
            horizon_angle: Some(result.horizon_angle),
            zenith_angle: Some(result.zenith_angle),
            failure: None,
        }
    }

    /// A failed entry.
    pub fn failed(index: usize, direction_angle: f64, failure: Failure) -> Self {
        Self {
            index,
            direction_angle,
            horizon_angle: None,
            zenith_angle: None,
            failure: Some(failure),
        }
    }

    /// True when this direction carries an angle pair.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Multi-direction response, ordered by direction index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelResponse {
    /// Overall status.
    pub status: BatchStatus,
    /// Number of directions evaluated (always `results.len()`).
    pub num_directions: usize,
    /// Per-direction results.
    pub results: Vec<DirectionEntry>,
}

/// Lifecycle state reported by the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Still initializing.
    Starting,
    /// Accepting queries.
    Running,
    /// Shut down.
    Stopped,
    /// Failed to initialize.
    Error,
}

/// Service identification and state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Current state.
    pub status: ServiceState,
}

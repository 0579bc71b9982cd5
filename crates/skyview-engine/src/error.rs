//! Error types for the engine.

use std::time::Duration;

use skyview_geom::GeomError;
use skyview_ir::{ErrorResponse, Failure, ReasonCode};
use thiserror::Error;

/// Why a single directional evaluation did not produce a result.
///
/// These never abort a batch; they are recorded at the direction's index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The evaluation exceeded its timeout.
    #[error("evaluation timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// A remote peer could not be reached or its reply could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// Geometry was rejected while evaluating.
    #[error(transparent)]
    Geometry(#[from] GeomError),

    /// The evaluation was cancelled or its task did not complete.
    #[error("evaluation cancelled: {0}")]
    Cancelled(String),

    /// A remote peer answered with an error body.
    #[error("remote peer rejected evaluation ({reason}): {message}")]
    Remote {
        /// Code reported by the peer.
        reason: ReasonCode,
        /// Message reported by the peer.
        message: String,
    },
}

impl EvaluationError {
    /// Stable reason code.
    pub fn reason(&self) -> ReasonCode {
        match self {
            EvaluationError::Timeout(_) => ReasonCode::EvaluationTimeout,
            EvaluationError::Transport(_) => ReasonCode::EvaluationTransport,
            EvaluationError::Geometry(e) => geom_reason(e),
            EvaluationError::Cancelled(_) => ReasonCode::EvaluationCancelled,
            EvaluationError::Remote { reason, .. } => *reason,
        }
    }

    /// Wire form of this failure.
    pub fn to_failure(&self) -> Failure {
        Failure {
            reason: self.reason(),
            message: self.to_string(),
        }
    }
}

/// Errors that reject a whole request.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or missing request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Geometry rejected before any evaluation started.
    #[error(transparent)]
    Geometry(#[from] GeomError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Stable reason code.
    pub fn reason(&self) -> ReasonCode {
        match self {
            EngineError::Validation(_) => ReasonCode::ValidationError,
            EngineError::Geometry(e) => geom_reason(e),
            EngineError::Config(_) | EngineError::Io(_) => ReasonCode::Internal,
        }
    }

    /// Wire error body for this error.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            reason: self.reason(),
            message: self.to_string(),
        }
    }
}

fn geom_reason(e: &GeomError) -> ReasonCode {
    match e {
        GeomError::DegenerateGeometry(_) | GeomError::MeshValidation { .. } => {
            ReasonCode::DegenerateGeometry
        }
        GeomError::InvalidSampleCount(_) => ReasonCode::InvalidSampleCount,
        GeomError::InvalidRange { .. } | GeomError::InvalidAngle(_) => ReasonCode::ValidationError,
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

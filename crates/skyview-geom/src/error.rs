//! Error types for obstruction geometry.

use skyview_math::AngleError;
use thiserror::Error;

/// Errors that can occur while building or querying obstruction geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    /// A triangle collapses to a line or a point.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A mesh was rejected in strict validation mode.
    #[error("mesh validation failed at triangle {index}: {reason}")]
    MeshValidation {
        /// Position of the offending triangle in the input list.
        index: usize,
        /// Why the triangle was rejected.
        reason: String,
    },

    /// Direction sampler asked for fewer than one sample.
    #[error("invalid sample count {0}: at least one direction is required")]
    InvalidSampleCount(usize),

    /// Angular range is empty, reversed, or not finite.
    #[error("invalid angular range [{start}, {end}]")]
    InvalidRange {
        /// Range start in degrees.
        start: f64,
        /// Range end in degrees.
        end: f64,
    },

    /// A direction angle could not be canonicalized.
    #[error(transparent)]
    InvalidAngle(#[from] AngleError),
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeomError>;

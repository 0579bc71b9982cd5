#![warn(missing_docs)]

//! Sky obstruction geometry.
//!
//! Given an observer and a triangle mesh of buildings or terrain, this
//! crate measures how much sky is blocked along a horizontal viewing
//! direction:
//!
//! 1. [`filter`] keeps triangles in front of the observer,
//! 2. [`plane`] cuts them with the vertical viewing plane,
//! 3. [`angles`] turns the resulting segments into horizon and zenith
//!    angles,
//! 4. [`sampler`] spreads many directions over an azimuth range.
//!
//! # Example
//!
//! ```
//! use skyview_geom::{compute_obstruction, Mesh, ValidationMode};
//! use skyview_math::{DirectionAngle, Point3};
//!
//! let wall = [[[10.0, 0.0, -5.0], [10.0, 0.0, 5.0], [10.0, 5.0, 0.0]]];
//! let mesh = Mesh::from_vertex_triples(&wall, ValidationMode::Strict)?.mesh;
//! let angle = DirectionAngle::new(0.0)?;
//! let result = compute_obstruction(Point3::new(0.0, 3.0, 0.0), angle, &mesh);
//! assert!((result.horizon_angle - 11.31).abs() < 0.01);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod angles;
pub mod error;
pub mod filter;
pub mod mesh;
pub mod plane;
pub mod query;
pub mod ray;
pub mod sampler;

pub use angles::{horizon_angle, zenith_angle, ObstructionResult};
pub use error::{GeomError, Result};
pub use filter::{filter_indices, filter_triangles};
pub use mesh::{Mesh, MeshBuild, SkippedTriangle, Triangle, ValidationMode};
pub use plane::{intersect_mesh, intersect_triangle, Plane, PlaneSection, Segment};
pub use query::{
    compute_horizon, compute_obstruction, compute_zenith, ObstructionQuery, QueryDiagnostics,
};
pub use ray::Ray;
pub use sampler::{AngularRange, DirectionSample, DirectionSampler, DEFAULT_SAMPLE_COUNT};

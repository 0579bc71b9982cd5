//! Single-direction obstruction pipeline: filter, section, measure.

use serde::Serialize;
use skyview_math::{DirectionAngle, Point3, Tolerance};
use tracing::debug;

use crate::angles::{horizon_angle_with_tolerance, zenith_angle_with_tolerance, ObstructionResult};
use crate::filter::filter_triangles;
use crate::mesh::{Mesh, Triangle};
use crate::plane::{intersect_mesh, section_triangles, Plane, Segment};
use crate::ray::Ray;

/// Intermediate counts from a single-direction query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryDiagnostics {
    /// Triangles in the input mesh.
    pub total_triangles: usize,
    /// Triangles kept by the direction filter.
    pub filtered_triangles: usize,
    /// Filtered triangles touched or crossed by the viewing plane.
    pub intersected_triangles: usize,
    /// Segments handed to the angle calculators.
    pub segment_count: usize,
    /// Distance along the horizontal line of sight to the first triangle,
    /// if any.
    pub nearest_obstruction_distance: Option<f64>,
}

/// Obstruction geometry for one observer and one azimuth.
///
/// Construction runs the direction filter and the plane intersector once;
/// the angle accessors reuse the resulting segments.
#[derive(Debug, Clone)]
pub struct ObstructionQuery<'m> {
    observer: Point3,
    angle: DirectionAngle,
    tolerance: Tolerance,
    plane: Plane,
    candidates: Vec<&'m Triangle>,
    segments: Vec<Segment>,
    total: usize,
}

impl<'m> ObstructionQuery<'m> {
    /// Prepare a query with default tolerances.
    pub fn new(observer: Point3, angle: DirectionAngle, mesh: &'m Mesh) -> Self {
        Self::with_tolerance(observer, angle, mesh, Tolerance::DEFAULT)
    }

    /// Prepare a query with custom tolerances.
    pub fn with_tolerance(
        observer: Point3,
        angle: DirectionAngle,
        mesh: &'m Mesh,
        tolerance: Tolerance,
    ) -> Self {
        let candidates = filter_triangles(&observer, angle, mesh);
        let plane = Plane::vertical(observer, angle);
        let segments = intersect_mesh(&plane, &candidates, tolerance.linear);

        debug!(
            direction = angle.degrees(),
            total = mesh.len(),
            filtered = candidates.len(),
            segments = segments.len(),
            "prepared obstruction query"
        );

        Self {
            observer,
            angle,
            tolerance,
            plane,
            candidates,
            segments,
            total: mesh.len(),
        }
    }

    /// The observer position.
    pub fn observer(&self) -> Point3 {
        self.observer
    }

    /// The viewing azimuth.
    pub fn angle(&self) -> DirectionAngle {
        self.angle
    }

    /// Segments where the viewing plane meets the filtered triangles.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Maximum obstruction elevation in degrees.
    pub fn horizon_angle(&self) -> f64 {
        horizon_angle_with_tolerance(&self.observer, self.angle, &self.segments, &self.tolerance)
    }

    /// Obstruction angle from the zenith in degrees.
    pub fn zenith_angle(&self) -> f64 {
        zenith_angle_with_tolerance(&self.observer, self.angle, &self.segments, &self.tolerance)
    }

    /// Both angles.
    pub fn result(&self) -> ObstructionResult {
        ObstructionResult {
            horizon_angle: self.horizon_angle(),
            zenith_angle: self.zenith_angle(),
        }
    }

    /// Distance to the first triangle hit by the horizontal line of sight.
    pub fn nearest_obstruction_distance(&self) -> Option<f64> {
        let ray = Ray::new(self.observer, self.angle.horizontal());
        ray.nearest_hit(self.candidates.iter().copied())
    }

    /// Filtered triangles the viewing plane touches or crosses.
    pub fn intersected_triangles(&self) -> usize {
        section_triangles(&self.plane, &self.candidates, self.tolerance.linear)
            .iter()
            .filter(|s| s.is_hit())
            .count()
    }

    /// Intermediate counts for diagnostics.
    pub fn diagnostics(&self) -> QueryDiagnostics {
        QueryDiagnostics {
            total_triangles: self.total,
            filtered_triangles: self.candidates.len(),
            intersected_triangles: self.intersected_triangles(),
            segment_count: self.segments.len(),
            nearest_obstruction_distance: self.nearest_obstruction_distance(),
        }
    }
}

/// Horizon and zenith angles for one direction.
pub fn compute_obstruction(
    observer: Point3,
    angle: DirectionAngle,
    mesh: &Mesh,
) -> ObstructionResult {
    ObstructionQuery::new(observer, angle, mesh).result()
}

/// Horizon angle only.
pub fn compute_horizon(observer: Point3, angle: DirectionAngle, mesh: &Mesh) -> f64 {
    ObstructionQuery::new(observer, angle, mesh).horizon_angle()
}

/// Zenith angle only.
pub fn compute_zenith(observer: Point3, angle: DirectionAngle, mesh: &Mesh) -> f64 {
    ObstructionQuery::new(observer, angle, mesh).zenith_angle()
}

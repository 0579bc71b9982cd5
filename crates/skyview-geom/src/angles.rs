//! Horizon and zenith angles from viewing-plane segments.
//!
//! Both calculators work on the same set of obstruction points: segment
//! endpoints clipped to the forward half of the viewing direction that lie
//! above the observer. Along a straight segment the elevation seen from the
//! observer is monotonic, so the extremes are always at (clipped) endpoints.

use serde::{Deserialize, Serialize};
use skyview_math::{height_above, DirectionAngle, Point3, Tolerance};
use tracing::warn;

use crate::plane::Segment;

/// Obstruction angles for one viewing direction, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstructionResult {
    /// Elevation of the highest obstruction above the horizontal, `[0, 90]`.
    pub horizon_angle: f64,
    /// Angle between the zenith and the highest obstruction, `[0, 90]`.
    pub zenith_angle: f64,
}

impl ObstructionResult {
    /// Result for a direction with nothing in the way.
    pub const UNOBSTRUCTED: Self = Self {
        horizon_angle: 0.0,
        zenith_angle: 90.0,
    };
}

/// An obstruction point in viewing-plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlanePoint {
    /// Distance ahead of the observer along the viewing direction.
    distance: f64,
    /// Height above the observer.
    height: f64,
}

/// Project segments into the viewing plane, clip them to the forward half,
/// and keep endpoints above the observer.
fn obstruction_points(
    observer: &Point3,
    angle: DirectionAngle,
    segments: &[Segment],
    tol: &Tolerance,
) -> Vec<PlanePoint> {
    let dir = angle.horizontal();
    let project = |p: &Point3| PlanePoint {
        distance: (p - observer).dot(&dir),
        height: height_above(p, observer),
    };

    let mut points = Vec::with_capacity(segments.len() * 2);
    for seg in segments {
        let a = project(&seg.a);
        let b = project(&seg.b);
        let a_front = a.distance >= -tol.linear;
        let b_front = b.distance >= -tol.linear;

        let clipped = match (a_front, b_front) {
            (true, true) => [a, b],
            (false, false) => continue,
            (true, false) | (false, true) => {
                let (front, back) = if a_front { (a, b) } else { (b, a) };
                let t = front.distance / (front.distance - back.distance);
                let edge = PlanePoint {
                    distance: 0.0,
                    height: front.height + t * (back.height - front.height),
                };
                [front, edge]
            }
        };

        points.extend(
            clipped
                .into_iter()
                .filter(|p| p.height > tol.linear)
                .map(|p| PlanePoint {
                    distance: p.distance.max(0.0),
                    height: p.height,
                }),
        );
    }
    points
}

/// Clamp an angle to `[0, 90]`, logging values that drifted outside.
fn clamp_degrees(value: f64, what: &'static str, fallback: f64) -> f64 {
    if value.is_nan() {
        warn!(angle = what, "numeric instability: angle is NaN, using {fallback}");
        return fallback;
    }
    if !(0.0..=90.0).contains(&value) {
        warn!(angle = what, value, "numeric instability: clamping angle to [0, 90]");
    }
    value.clamp(0.0, 90.0)
}

/// Maximum elevation angle (degrees) of any obstruction ahead of the
/// observer. Returns 0 when nothing qualifies.
pub fn horizon_angle(observer: &Point3, angle: DirectionAngle, segments: &[Segment]) -> f64 {
    horizon_angle_with_tolerance(observer, angle, segments, &Tolerance::DEFAULT)
}

/// [`horizon_angle`] with a custom tolerance.
pub fn horizon_angle_with_tolerance(
    observer: &Point3,
    angle: DirectionAngle,
    segments: &[Segment],
    tol: &Tolerance,
) -> f64 {
    let max = obstruction_points(observer, angle, segments, tol)
        .into_iter()
        .map(|p| p.height.atan2(p.distance).to_degrees())
        .fold(0.0, f64::max);
    clamp_degrees(max, "horizon", 0.0)
}

/// Smallest angle (degrees) between the zenith and any obstruction ahead
/// of the observer. Returns 90 when nothing qualifies.
pub fn zenith_angle(observer: &Point3, angle: DirectionAngle, segments: &[Segment]) -> f64 {
    zenith_angle_with_tolerance(observer, angle, segments, &Tolerance::DEFAULT)
}

/// [`zenith_angle`] with a custom tolerance.
pub fn zenith_angle_with_tolerance(
    observer: &Point3,
    angle: DirectionAngle,
    segments: &[Segment],
    tol: &Tolerance,
) -> f64 {
    let min = obstruction_points(observer, angle, segments, tol)
        .into_iter()
        .map(|p| p.distance.atan2(p.height).to_degrees())
        .fold(90.0, f64::min);
    clamp_degrees(min, "zenith", 90.0)
}

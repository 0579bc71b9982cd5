#![warn(missing_docs)]

//! Math types for the skyview obstruction engine.
//!
//! Thin wrappers around nalgebra providing the domain types used by the
//! geometry crates: points, vectors, tolerance constants, and the azimuth
//! convention shared by every query.
//!
//! World axis `+Y` is up; the horizontal plane is X–Z. An azimuth of 0°
//! looks along `+X` and 90° looks along `+Z`.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// The world up direction (`+Y`).
#[inline]
pub fn up() -> Vec3 {
    Vec3::y()
}

/// Drop the vertical component of a vector, leaving its X–Z part.
#[inline]
pub fn horizontal_part(v: &Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Height of `p` above `reference`, measured along the up axis.
#[inline]
pub fn height_above(p: &Point3, reference: &Point3) -> f64 {
    p.y - reference.y
}

/// Errors from angle construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AngleError {
    /// Angle is NaN or infinite and cannot be canonicalized.
    #[error("angle {0} is not a finite number of degrees")]
    NotFinite(f64),
}

/// A horizontal viewing azimuth in degrees, canonicalized to `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DirectionAngle(f64);

impl DirectionAngle {
    /// Build an azimuth from degrees, wrapping into `[0, 360)`.
    pub fn new(degrees: f64) -> Result<Self, AngleError> {
        if !degrees.is_finite() {
            return Err(AngleError::NotFinite(degrees));
        }
        let mut wrapped = degrees.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if wrapped >= 360.0 {
            wrapped = 0.0;
        }
        Ok(Self(wrapped))
    }

    /// Angle in degrees.
    #[inline]
    pub fn degrees(&self) -> f64 {
        self.0
    }

    /// Angle in radians.
    #[inline]
    pub fn radians(&self) -> f64 {
        self.0.to_radians()
    }

    /// Horizontal unit vector the observer faces: `(cos θ, 0, sin θ)`.
    pub fn horizontal(&self) -> Vec3 {
        let (s, c) = self.radians().sin_cos();
        Vec3::new(c, 0.0, s)
    }

    /// Horizontal unit vector perpendicular to [`Self::horizontal`]:
    /// `(-sin θ, 0, cos θ)`.
    pub fn lateral(&self) -> Vec3 {
        let (s, c) = self.radians().sin_cos();
        Vec3::new(-s, 0.0, c)
    }
}

impl TryFrom<f64> for DirectionAngle {
    type Error = AngleError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DirectionAngle> for f64 {
    fn from(angle: DirectionAngle) -> Self {
        angle.0
    }
}

impl std::fmt::Display for DirectionAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Linear distance tolerance in model units.
    pub linear: f64,
    /// Angular tolerance in degrees.
    pub angular: f64,
    /// Relative area tolerance for degenerate triangles: a triangle is
    /// degenerate when `|e1 × e2| <= area * max_edge²`.
    pub area: f64,
}

impl Tolerance {
    /// Default tolerances (1e-9 for every measure).
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        angular: 1e-9,
        area: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() <= self.linear
    }

    /// Check if two angles (in degrees) are effectively equal.
    pub fn angles_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

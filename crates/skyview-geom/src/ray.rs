//! Ray representation and ray–triangle intersection.

use skyview_math::{Dir3, Point3, Vec3};

use crate::mesh::Triangle;

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: Dir3::new_normalize(direction),
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction.into_inner() * t
    }

    /// Möller–Trumbore intersection with a triangle.
    ///
    /// Returns the ray parameter of the hit, or `None` when the ray is
    /// parallel to the triangle, misses it, or hits behind the origin.
    pub fn intersect_triangle(&self, tri: &Triangle) -> Option<f64> {
        const EPS: f64 = 1e-12;

        let [v0, v1, v2] = tri.vertices();
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let dir = self.direction.as_ref();

        let p = dir.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = self.origin - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&e1);
        let v = dir.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&q) * inv_det;
        (t > EPS).then_some(t)
    }

    /// Parameter of the closest hit among `triangles`.
    pub fn nearest_hit<'a, I>(&self, triangles: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a Triangle>,
    {
        triangles
            .into_iter()
            .filter_map(|tri| self.intersect_triangle(tri))
            .min_by(|a, b| a.total_cmp(b))
    }
}

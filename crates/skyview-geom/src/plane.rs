//! Plane–triangle intersection.
//!
//! Vertices are classified by signed distance to the plane with an epsilon
//! band treated as "on the plane". Edge crossings are found by linear
//! interpolation between vertices strictly on opposite sides, so the
//! interpolation denominator is always at least `2 * eps`.

use rayon::prelude::*;
use skyview_math::{up, Dir3, DirectionAngle, Point3, Vec3};

use crate::mesh::Triangle;

/// Triangle count above which [`section_triangles`] runs in parallel.
const PARALLEL_THRESHOLD: usize = 1024;

/// An infinite plane through `origin` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// A point on the plane.
    pub origin: Point3,
    /// Unit normal.
    pub normal: Dir3,
}

impl Plane {
    /// Create a plane; the normal is normalized.
    pub fn new(origin: Point3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: Dir3::new_normalize(normal),
        }
    }

    /// The vertical viewing plane through `observer` containing the
    /// horizontal direction of `angle`. Its normal is horizontal and
    /// perpendicular to the viewing direction.
    pub fn vertical(observer: Point3, angle: DirectionAngle) -> Self {
        Self::new(observer, angle.lateral())
    }

    /// The horizontal plane at height `y`.
    pub fn horizontal(y: f64) -> Self {
        Self::new(Point3::new(0.0, y, 0.0), up())
    }

    /// Signed distance from `p` to the plane (positive on the normal side).
    #[inline]
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal.as_ref())
    }
}

/// A straight segment between two points; `a == b` for a touching vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// First endpoint.
    pub a: Point3,
    /// Second endpoint.
    pub b: Point3,
}

impl Segment {
    /// Create a segment.
    pub fn new(a: Point3, b: Point3) -> Self {
        Self { a, b }
    }

    /// A zero-length segment at `p`.
    pub fn point(p: Point3) -> Self {
        Self { a: p, b: p }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// True when both endpoints coincide within `eps`.
    pub fn is_degenerate(&self, eps: f64) -> bool {
        self.length() <= eps
    }

    /// Both endpoints.
    pub fn endpoints(&self) -> [Point3; 2] {
        [self.a, self.b]
    }
}

/// How a plane meets a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneSection {
    /// The plane does not reach the triangle.
    Miss,
    /// Exactly one vertex lies on the plane; the rest are on one side.
    Touch(Point3),
    /// The plane cuts the triangle along one segment (possibly an edge).
    Crossing(Segment),
    /// The triangle lies in the plane; its three edges.
    Coplanar([Segment; 3]),
}

impl PlaneSection {
    /// True unless this is [`PlaneSection::Miss`].
    pub fn is_hit(&self) -> bool {
        !matches!(self, PlaneSection::Miss)
    }

    /// Segments making up the section. A touch becomes one zero-length
    /// segment.
    pub fn segments(&self) -> Vec<Segment> {
        match *self {
            PlaneSection::Miss => Vec::new(),
            PlaneSection::Touch(p) => vec![Segment::point(p)],
            PlaneSection::Crossing(s) => vec![s],
            PlaneSection::Coplanar(edges) => edges.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Above,
    On,
    Below,
}

fn classify(d: f64, eps: f64) -> Side {
    if d > eps {
        Side::Above
    } else if d < -eps {
        Side::Below
    } else {
        Side::On
    }
}

fn lerp(a: &Point3, b: &Point3, da: f64, db: f64) -> Point3 {
    let t = da / (da - db);
    a + (b - a) * t
}

/// Intersect a single triangle with a plane.
pub fn intersect_triangle(plane: &Plane, tri: &Triangle, eps: f64) -> PlaneSection {
    let v = tri.vertices();
    let d = [
        plane.signed_distance(&v[0]),
        plane.signed_distance(&v[1]),
        plane.signed_distance(&v[2]),
    ];
    let side = [classify(d[0], eps), classify(d[1], eps), classify(d[2], eps)];

    let on: Vec<usize> = (0..3).filter(|&i| side[i] == Side::On).collect();

    match on.len() {
        3 => {
            let [e0, e1, e2] = tri.edges();
            PlaneSection::Coplanar([
                Segment::new(e0.0, e0.1),
                Segment::new(e1.0, e1.1),
                Segment::new(e2.0, e2.1),
            ])
        }
        2 => PlaneSection::Crossing(Segment::new(v[on[0]], v[on[1]])),
        1 => {
            let i = on[0];
            let j = (i + 1) % 3;
            let k = (i + 2) % 3;
            if side[j] == side[k] {
                PlaneSection::Touch(v[i])
            } else {
                PlaneSection::Crossing(Segment::new(v[i], lerp(&v[j], &v[k], d[j], d[k])))
            }
        }
        _ => {
            if side[0] == side[1] && side[1] == side[2] {
                return PlaneSection::Miss;
            }
            let mut points = Vec::with_capacity(2);
            for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                if side[a] != side[b] {
                    points.push(lerp(&v[a], &v[b], d[a], d[b]));
                }
            }
            PlaneSection::Crossing(Segment::new(points[0], points[1]))
        }
    }
}

/// Intersect every triangle with the plane, keeping input order.
pub fn section_triangles(plane: &Plane, triangles: &[&Triangle], eps: f64) -> Vec<PlaneSection> {
    if triangles.len() >= PARALLEL_THRESHOLD {
        triangles
            .par_iter()
            .map(|tri| intersect_triangle(plane, tri, eps))
            .collect()
    } else {
        triangles
            .iter()
            .map(|tri| intersect_triangle(plane, tri, eps))
            .collect()
    }
}

/// All intersection segments between the plane and the triangles.
pub fn intersect_mesh(plane: &Plane, triangles: &[&Triangle], eps: f64) -> Vec<Segment> {
    section_triangles(plane, triangles, eps)
        .iter()
        .flat_map(PlaneSection::segments)
        .collect()
}

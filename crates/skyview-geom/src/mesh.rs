//! Triangle and mesh model with degenerate-geometry validation.

use serde::{Deserialize, Serialize};
use skyview_math::{Point3, Tolerance, Vec3};
use tracing::warn;

use crate::error::{GeomError, Result};

/// A non-degenerate triangle with vertices in input order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    v0: Point3,
    v1: Point3,
    v2: Point3,
}

impl Triangle {
    /// Create a triangle, rejecting collinear or coincident vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Result<Self> {
        Self::with_tolerance(v0, v1, v2, &Tolerance::DEFAULT)
    }

    /// Create a triangle using a custom degeneracy tolerance.
    ///
    /// The triangle is degenerate when `|(v1 - v0) × (v2 - v0)|` is at most
    /// `tol.area` times the squared length of its longest edge, which makes
    /// the test independent of model scale.
    pub fn with_tolerance(v0: Point3, v1: Point3, v2: Point3, tol: &Tolerance) -> Result<Self> {
        if [v0, v1, v2]
            .iter()
            .any(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
        {
            return Err(GeomError::DegenerateGeometry(
                "vertex coordinates must be finite".into(),
            ));
        }

        let e01 = v1 - v0;
        let e12 = v2 - v1;
        let e20 = v0 - v2;
        let max_edge_sq = e01
            .norm_squared()
            .max(e12.norm_squared())
            .max(e20.norm_squared());
        if max_edge_sq == 0.0 {
            return Err(GeomError::DegenerateGeometry(
                "all three vertices coincide".into(),
            ));
        }

        let cross = e01.cross(&(v2 - v0));
        if cross.norm() <= tol.area * max_edge_sq {
            return Err(GeomError::DegenerateGeometry(
                "vertices are collinear".into(),
            ));
        }

        Ok(Self { v0, v1, v2 })
    }

    /// The three vertices in input order.
    #[inline]
    pub fn vertices(&self) -> [Point3; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Edges as vertex pairs: `(v0, v1)`, `(v1, v2)`, `(v2, v0)`.
    pub fn edges(&self) -> [(Point3, Point3); 3] {
        [(self.v0, self.v1), (self.v1, self.v2), (self.v2, self.v0)]
    }

    /// Arithmetic mean of the vertices.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Unit normal following the right-hand rule over `v0, v1, v2`.
    pub fn normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).normalize()
    }

    /// Surface area.
    pub fn area(&self) -> f64 {
        0.5 * (self.v1 - self.v0).cross(&(self.v2 - self.v0)).norm()
    }

    /// Vertical extent as `(min_y, max_y)`.
    pub fn y_range(&self) -> (f64, f64) {
        let lo = self.v0.y.min(self.v1.y).min(self.v2.y);
        let hi = self.v0.y.max(self.v1.y).max(self.v2.y);
        (lo, hi)
    }
}

/// How invalid triangles in an input mesh are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Reject the whole mesh on the first invalid triangle.
    Strict,
    /// Skip invalid triangles and record a warning for each.
    #[default]
    Lenient,
}

/// A triangle dropped during lenient mesh construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTriangle {
    /// Position of the triangle in the input list.
    pub index: usize,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of building a mesh from raw vertex triples.
#[derive(Debug, Clone, Default)]
pub struct MeshBuild {
    /// The validated mesh.
    pub mesh: Mesh,
    /// Triangles skipped in lenient mode (always empty in strict mode).
    pub skipped: Vec<SkippedTriangle>,
}

/// An ordered collection of obstruction triangles.
///
/// An empty mesh is valid and means nothing obstructs the sky.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap already-validated triangles.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Build a mesh from raw `[[x, y, z]; 3]` triples.
    pub fn from_vertex_triples(
        triples: &[[[f64; 3]; 3]],
        mode: ValidationMode,
    ) -> Result<MeshBuild> {
        Self::from_vertex_triples_with_tolerance(triples, mode, &Tolerance::DEFAULT)
    }

    /// Build a mesh from raw triples using a custom tolerance.
    pub fn from_vertex_triples_with_tolerance(
        triples: &[[[f64; 3]; 3]],
        mode: ValidationMode,
        tol: &Tolerance,
    ) -> Result<MeshBuild> {
        let mut triangles = Vec::with_capacity(triples.len());
        let mut skipped = Vec::new();

        for (index, [a, b, c]) in triples.iter().enumerate() {
            let tri = Triangle::with_tolerance(
                Point3::new(a[0], a[1], a[2]),
                Point3::new(b[0], b[1], b[2]),
                Point3::new(c[0], c[1], c[2]),
                tol,
            );
            match (tri, mode) {
                (Ok(tri), _) => triangles.push(tri),
                (Err(e), ValidationMode::Strict) => {
                    return Err(GeomError::MeshValidation {
                        index,
                        reason: e.to_string(),
                    });
                }
                (Err(e), ValidationMode::Lenient) => {
                    warn!(index, error = %e, "skipping invalid triangle");
                    skipped.push(SkippedTriangle {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(MeshBuild {
            mesh: Self { triangles },
            skipped,
        })
    }

    /// Triangles in insertion order.
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles.
    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True when the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        let first = self.triangles.first()?.vertices()[0];
        let mut min = first;
        let mut max = first;
        for v in self.triangles.iter().flat_map(|t| t.vertices()) {
            min = min.inf(&v);
            max = max.sup(&v);
        }
        Some((min, max))
    }
}

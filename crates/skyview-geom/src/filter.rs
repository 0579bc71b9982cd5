//! Direction filter: keep triangles in the forward half-space of an azimuth.

use skyview_math::{horizontal_part, DirectionAngle, Point3};

use crate::mesh::{Mesh, Triangle};

/// True when the horizontal projection of `point - observer` lies within
/// ±90° of the viewing direction.
///
/// Points exactly abreast of the observer (and points directly above or
/// below it) count as in front; anything with a negative projection is
/// rejected.
pub fn is_in_front(observer: &Point3, angle: DirectionAngle, point: &Point3) -> bool {
    let offset = horizontal_part(&(point - observer));
    offset.dot(&angle.horizontal()) >= 0.0
}

/// Indices of triangles whose centroid lies in the forward half-space,
/// in mesh order.
pub fn filter_indices(observer: &Point3, angle: DirectionAngle, mesh: &Mesh) -> Vec<usize> {
    mesh.triangles()
        .iter()
        .enumerate()
        .filter(|(_, tri)| is_in_front(observer, angle, &tri.centroid()))
        .map(|(i, _)| i)
        .collect()
}

/// Triangles whose centroid lies in the forward half-space, in mesh order.
pub fn filter_triangles<'a>(
    observer: &Point3,
    angle: DirectionAngle,
    mesh: &'a Mesh,
) -> Vec<&'a Triangle> {
    mesh.triangles()
        .iter()
        .filter(|tri| is_in_front(observer, angle, &tri.centroid()))
        .collect()
}

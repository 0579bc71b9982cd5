//! Conversion between wire shapes and core geometry types.

use skyview_geom::{Mesh, MeshBuild, ObstructionResult, ValidationMode};
use skyview_ir::{MeshValidation, MeshWire, ObstructionResponse};
use skyview_math::Point3;

use crate::error::{EngineError, Result};

/// Observer position from wire coordinates.
pub fn observer_from_wire(x: f64, y: f64, z: f64) -> Result<Point3> {
    for (name, v) in [("x", x), ("y", y), ("z", z)] {
        if !v.is_finite() {
            return Err(EngineError::Validation(format!(
                "observer coordinate {name} must be finite, got {v}"
            )));
        }
    }
    Ok(Point3::new(x, y, z))
}

/// Resolve the validation policy for a request.
pub fn validation_mode(
    requested: Option<MeshValidation>,
    default: ValidationMode,
) -> ValidationMode {
    match requested {
        Some(MeshValidation::Strict) => ValidationMode::Strict,
        Some(MeshValidation::Lenient) => ValidationMode::Lenient,
        None => default,
    }
}

/// Build a mesh from the wire format.
///
/// Wrong triangle arity is a validation error in every mode; degenerate
/// triangles follow `mode`.
pub fn mesh_from_wire(wire: &MeshWire, mode: ValidationMode) -> Result<MeshBuild> {
    let mut triples = Vec::with_capacity(wire.len());
    for (index, tri) in wire.iter().enumerate() {
        match tri.as_slice() {
            [a, b, c] => triples.push([*a, *b, *c]),
            other => {
                return Err(EngineError::Validation(format!(
                    "triangle {index} has {} vertices, expected 3",
                    other.len()
                )))
            }
        }
    }
    Ok(Mesh::from_vertex_triples(&triples, mode)?)
}

/// Serialize a mesh back to the wire format.
pub fn mesh_to_wire(mesh: &Mesh) -> MeshWire {
    mesh.triangles()
        .iter()
        .map(|tri| {
            tri.vertices()
                .iter()
                .map(|v| [v.x, v.y, v.z])
                .collect()
        })
        .collect()
}

/// Wire form of an obstruction result.
pub fn response_from_result(result: ObstructionResult) -> ObstructionResponse {
    ObstructionResponse {
        horizon_angle: result.horizon_angle,
        zenith_angle: result.zenith_angle,
    }
}

/// Core form of an obstruction response.
pub fn result_from_response(response: ObstructionResponse) -> ObstructionResult {
    ObstructionResult {
        horizon_angle: response.horizon_angle,
        zenith_angle: response.zenith_angle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyview_ir::ReasonCode;

    #[test]
    fn test_observer_rejects_non_finite() {
        assert!(observer_from_wire(0.0, f64::NAN, 0.0).is_err());
        assert_eq!(observer_from_wire(1.0, 2.0, 3.0).unwrap(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_wrong_arity_is_validation_error() {
        let wire: MeshWire = vec![vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]];
        let err = mesh_from_wire(&wire, ValidationMode::Lenient).unwrap_err();
        assert_eq!(err.reason(), ReasonCode::ValidationError);
        assert!(err.to_string().contains("triangle 0 has 2 vertices"));
    }

    #[test]
    fn test_strict_degenerate_is_geometry_error() {
        let wire: MeshWire = vec![vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]];
        let err = mesh_from_wire(&wire, ValidationMode::Strict).unwrap_err();
        assert_eq!(err.reason(), ReasonCode::DegenerateGeometry);
        let build = mesh_from_wire(&wire, ValidationMode::Lenient).unwrap();
        assert!(build.mesh.is_empty());
        assert_eq!(build.skipped.len(), 1);
    }

    #[test]
    fn test_mesh_wire_round_trip() {
        let wire: MeshWire = vec![vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]];
        let mesh = mesh_from_wire(&wire, ValidationMode::Strict).unwrap().mesh;
        assert_eq!(mesh_to_wire(&mesh), wire);
    }

    #[test]
    fn test_validation_mode_resolution() {
        assert_eq!(validation_mode(None, ValidationMode::Strict), ValidationMode::Strict);
        assert_eq!(
            validation_mode(Some(MeshValidation::Lenient), ValidationMode::Strict),
            ValidationMode::Lenient
        );
    }
}

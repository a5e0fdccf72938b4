//! Vertex-to-node load transfer.

use crate::error::SolverError;
use fsi_coupling::{CouplingResult, ForceMapper};
use fsi_state::FORCE_COLUMNS;
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Lumps each vertex load onto its structural node.
///
/// Forces are rotated into the body frame; the moment picks up the lever arm
/// from the node to the vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexForceMapper;

impl ForceMapper for VertexForceMapper {
    fn map(
        &self,
        forces: &DMatrix<f64>,
        struct2aero: &[usize],
        zeta: &[Vector3<f64>],
        pos: &[Vector3<f64>],
        _psi: &[Vector3<f64>],
        cag: &Matrix3<f64>,
    ) -> CouplingResult<DMatrix<f64>> {
        let num_vertex = zeta.len();
        if forces.nrows() != num_vertex || forces.ncols() != FORCE_COLUMNS {
            return Err(SolverError::InvalidArg {
                what: format!(
                    "vertex forces are {}x{}, expected {num_vertex}x{FORCE_COLUMNS}",
                    forces.nrows(),
                    forces.ncols()
                ),
            }
            .into());
        }
        if struct2aero.len() != num_vertex {
            return Err(SolverError::InvalidArg {
                what: format!(
                    "{} vertex-to-node entries for {num_vertex} vertices",
                    struct2aero.len()
                ),
            }
            .into());
        }

        let mut nodal = DMatrix::zeros(pos.len(), FORCE_COLUMNS);
        for (v, &node) in struct2aero.iter().enumerate() {
            if node >= pos.len() {
                return Err(SolverError::InvalidArg {
                    what: format!("vertex {v} maps to node {node} of {}", pos.len()),
                }
                .into());
            }
            let f_g = Vector3::new(forces[(v, 0)], forces[(v, 1)], forces[(v, 2)]);
            let m_g = Vector3::new(forces[(v, 3)], forces[(v, 4)], forces[(v, 5)]);
            let f_a = cag * f_g;
            let m_a = cag * m_g + (zeta[v] - pos[node]).cross(&f_a);
            for i in 0..3 {
                nodal[(node, i)] += f_a[i];
                nodal[(node, 3 + i)] += m_a[i];
            }
        }
        Ok(nodal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lumps_force_and_lever_arm_moment() {
        let mut forces = DMatrix::zeros(2, 6);
        forces[(0, 2)] = 1.0;
        forces[(1, 2)] = 2.0;
        let zeta = [Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)];
        let pos = [Vector3::zeros()];
        let out = VertexForceMapper
            .map(&forces, &[0, 0], &zeta, &pos, &[Vector3::zeros()], &Matrix3::identity())
            .unwrap();
        assert_eq!(out.shape(), (1, 6));
        assert_eq!(out[(0, 2)], 3.0);
        // r = +x, F = +z: moment about -y
        assert_eq!(out[(0, 4)], -1.0);
    }

    #[test]
    fn rotates_into_body_frame() {
        let mut forces = DMatrix::zeros(1, 6);
        forces[(0, 0)] = 1.0;
        let cag = Matrix3::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let out = VertexForceMapper
            .map(&forces, &[0], &[Vector3::zeros()], &[Vector3::zeros()], &[Vector3::zeros()], &cag)
            .unwrap();
        assert_eq!(out[(0, 0)], 0.0);
        assert_eq!(out[(0, 1)], -1.0);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let forces = DMatrix::zeros(2, 6);
        let zeta = [Vector3::zeros(); 2];
        let err = VertexForceMapper
            .map(&forces, &[0], &zeta, &[Vector3::zeros()], &[], &Matrix3::identity())
            .unwrap_err();
        assert!(err.to_string().contains("vertex-to-node"));
    }
}

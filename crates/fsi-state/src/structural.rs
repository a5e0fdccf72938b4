//! Structural snapshot for one recorded timestep.

use nalgebra::{DMatrix, DVector, Matrix3, Quaternion, UnitQuaternion, Vector3, Vector6};

/// Columns of an applied-force array: force xyz followed by moment xyz.
pub const FORCE_COLUMNS: usize = 6;

/// State of the structure at one timestep.
///
/// Forces are indexed by structural node, one row per node.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuralTimestepState {
    /// Generalized coordinates
    pub q: DVector<f64>,
    /// First time derivative of `q`
    pub dqdt: DVector<f64>,
    /// Second time derivative of `q`
    pub dqddt: DVector<f64>,
    /// Nodal positions in the body (A) frame
    pub pos: Vec<Vector3<f64>>,
    /// Nodal orientations as Cartesian rotation vectors
    pub psi: Vec<Vector3<f64>>,
    /// Steady applied forces, `num_node x 6`
    pub steady_applied_forces: DMatrix<f64>,
    /// Unsteady applied forces, `num_node x 6`
    pub unsteady_applied_forces: DMatrix<f64>,
    /// Frame-of-reference velocity (linear xyz, angular xyz) in the A frame
    pub for_vel: Vector6<f64>,
    /// Frame-of-reference position in the inertial (G) frame
    pub for_pos: Vector3<f64>,
    /// Orientation of the A frame relative to G, `(w, i, j, k)`
    pub quat: Quaternion<f64>,
}

impl StructuralTimestepState {
    /// Zero state for `num_node` nodes and `num_dof` generalized coordinates.
    pub fn new(num_node: usize, num_dof: usize) -> Self {
        Self {
            q: DVector::zeros(num_dof),
            dqdt: DVector::zeros(num_dof),
            dqddt: DVector::zeros(num_dof),
            pos: vec![Vector3::zeros(); num_node],
            psi: vec![Vector3::zeros(); num_node],
            steady_applied_forces: DMatrix::zeros(num_node, FORCE_COLUMNS),
            unsteady_applied_forces: DMatrix::zeros(num_node, FORCE_COLUMNS),
            for_vel: Vector6::zeros(),
            for_pos: Vector3::zeros(),
            quat: Quaternion::identity(),
        }
    }

    pub fn num_node(&self) -> usize {
        self.pos.len()
    }

    /// Rotation matrix taking inertial (G) components to body (A) components.
    pub fn cag(&self) -> Matrix3<f64> {
        self.cga().transpose()
    }

    /// Rotation matrix taking body (A) components to inertial (G) components.
    pub fn cga(&self) -> Matrix3<f64> {
        UnitQuaternion::from_quaternion(self.quat)
            .to_rotation_matrix()
            .into_inner()
    }

    /// Normalise the trailing quaternion block of `dqdt` and copy it into `quat`.
    ///
    /// Free-flying formulations store the orientation quaternion as the last
    /// four entries of `dqdt`. Does nothing when there is no such block or
    /// it has zero norm.
    pub fn normalise_quaternion(&mut self) {
        let n = self.dqdt.len();
        if n < 4 {
            return;
        }
        let mut block = self.dqdt.rows_mut(n - 4, 4);
        let norm = block.norm();
        if norm == 0.0 {
            return;
        }
        block /= norm;
        self.quat = Quaternion::new(block[0], block[1], block[2], block[3]);
    }

    /// Sum of one column of the steady applied forces.
    pub fn total_steady_force(&self, column: usize) -> f64 {
        self.steady_applied_forces.column(column).sum()
    }
}

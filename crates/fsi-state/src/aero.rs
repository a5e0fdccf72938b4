//! Aerodynamic snapshot for one recorded timestep.

use crate::structural::FORCE_COLUMNS;
use nalgebra::{DMatrix, Vector3};

/// Surface grid, loads and wake at one timestep.
#[derive(Clone, Debug, PartialEq)]
pub struct AeroTimestepState {
    /// Grid vertex coordinates, body-frame axes
    pub zeta: Vec<Vector3<f64>>,
    /// Steady forces at each grid vertex, `num_vertex x 6`
    pub forces: DMatrix<f64>,
    /// Unsteady forces at each grid vertex, `num_vertex x 6`
    pub dynamic_forces: DMatrix<f64>,
    /// Wake geometry
    pub wake: Vec<Vector3<f64>>,
}

impl AeroTimestepState {
    pub fn new(num_vertex: usize) -> Self {
        Self {
            zeta: vec![Vector3::zeros(); num_vertex],
            forces: DMatrix::zeros(num_vertex, FORCE_COLUMNS),
            dynamic_forces: DMatrix::zeros(num_vertex, FORCE_COLUMNS),
            wake: Vec::new(),
        }
    }

    pub fn num_vertex(&self) -> usize {
        self.zeta.len()
    }
}

//! Construction of the simulation state from a case model.

use crate::ProjectResult;
use crate::schema::ModelDef;
use fsi_state::{
    AeroData, AeroTimestepState, FORCE_COLUMNS, SimulationState, StructuralData,
    StructuralTimestepState,
};
use nalgebra::{DMatrix, Vector3, Vector6};

fn rows_to_matrix(rows: &[[f64; 6]]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), FORCE_COLUMNS, |r, c| rows[r][c])
}

/// Build a state holding one seed entry in each history.
///
/// Generalized coordinates are the stacked nodal displacements from
/// `reference_nodes`, zero when no reference is given.
pub fn build_state(model: &ModelDef) -> ProjectResult<SimulationState> {
    let num_node = model.nodes.len();
    let mut ini = StructuralTimestepState::new(num_node, 3 * num_node);
    ini.pos = model.nodes.iter().map(|p| Vector3::from(*p)).collect();
    if let Some(reference) = &model.reference_nodes {
        for (i, (cur, rest)) in model.nodes.iter().zip(reference).enumerate() {
            for axis in 0..3 {
                ini.q[3 * i + axis] = cur[axis] - rest[axis];
            }
        }
    }
    ini.for_vel = Vector6::from(model.for_vel);
    if let Some(steady) = &model.steady_forces {
        ini.steady_applied_forces = rows_to_matrix(steady);
    }

    let mut structure = StructuralData::new(ini);
    if let Some(dynamic) = &model.dynamic_forces {
        structure.dynamic_forces = dynamic.iter().map(|t| rows_to_matrix(t)).collect();
    }

    let mut grid = AeroTimestepState::new(model.vertices.len());
    grid.zeta = model
        .vertices
        .iter()
        .map(|v| Vector3::from(v.position))
        .collect();
    let struct2aero = model.vertices.iter().map(|v| v.node).collect();

    Ok(SimulationState::new(
        structure,
        AeroData::new(grid, struct2aero),
    )?)
}

//! Shared simulation object: history buffers, time cursor and inputs.

use crate::aero::AeroTimestepState;
use crate::error::{StateError, StateResult};
use crate::structural::{FORCE_COLUMNS, StructuralTimestepState};
use nalgebra::{DMatrix, Vector3};

/// Structural history plus the inputs that are not produced by the aero side.
#[derive(Clone, Debug)]
pub struct StructuralData {
    /// One entry per recorded timestep; index 0 is the seed state
    pub timestep_info: Vec<StructuralTimestepState>,
    /// Initial state, carries the prescribed steady forces
    pub ini_info: StructuralTimestepState,
    /// Prescribed unsteady forces per timestep, `num_node x 6` each
    pub dynamic_forces: Vec<DMatrix<f64>>,
}

impl StructuralData {
    /// Structure with a single seed entry equal to `ini_info`.
    pub fn new(ini_info: StructuralTimestepState) -> Self {
        Self {
            timestep_info: vec![ini_info.clone()],
            ini_info,
            dynamic_forces: Vec::new(),
        }
    }

    pub fn num_node(&self) -> usize {
        self.ini_info.num_node()
    }

    pub fn last(&self) -> StateResult<&StructuralTimestepState> {
        self.timestep_info.last().ok_or(StateError::EmptyHistory {
            what: "structural timestep_info",
        })
    }

    pub fn last_mut(&mut self) -> StateResult<&mut StructuralTimestepState> {
        self.timestep_info.last_mut().ok_or(StateError::EmptyHistory {
            what: "structural timestep_info",
        })
    }

    /// Append a copy of the last entry as a placeholder for the next step.
    pub fn add_step(&mut self) -> StateResult<()> {
        let placeholder = self.last()?.clone();
        self.timestep_info.push(placeholder);
        Ok(())
    }

    /// Prescribed unsteady forces at `index`; zeros when none were given.
    pub fn prescribed_dynamic_forces(&self, index: usize) -> DMatrix<f64> {
        self.dynamic_forces
            .get(index)
            .cloned()
            .unwrap_or_else(|| DMatrix::zeros(self.num_node(), FORCE_COLUMNS))
    }

    /// Advance the frame-of-reference position of entry `index` over `dt`.
    ///
    /// The linear part of `for_vel` is expressed in the body frame and is
    /// rotated to the inertial frame before integration.
    pub fn integrate_position(&mut self, index: usize, dt: f64) -> StateResult<()> {
        let len = self.timestep_info.len();
        let step = self
            .timestep_info
            .get_mut(index)
            .ok_or(StateError::IndexOob {
                what: "structural timestep_info",
                index,
                len,
            })?;
        let vel_a = Vector3::new(step.for_vel[0], step.for_vel[1], step.for_vel[2]);
        step.for_pos += step.cga() * vel_a * dt;
        Ok(())
    }
}

/// Aerodynamic history plus the grid-to-structure mapping.
#[derive(Clone, Debug)]
pub struct AeroData {
    /// One entry per recorded timestep; index 0 is the seed state
    pub timestep_info: Vec<AeroTimestepState>,
    /// Structural node receiving the load of each grid vertex
    pub struct2aero: Vec<usize>,
}

impl AeroData {
    pub fn new(seed: AeroTimestepState, struct2aero: Vec<usize>) -> Self {
        Self {
            timestep_info: vec![seed],
            struct2aero,
        }
    }

    pub fn last(&self) -> StateResult<&AeroTimestepState> {
        self.timestep_info.last().ok_or(StateError::EmptyHistory {
            what: "aero timestep_info",
        })
    }

    pub fn last_mut(&mut self) -> StateResult<&mut AeroTimestepState> {
        self.timestep_info.last_mut().ok_or(StateError::EmptyHistory {
            what: "aero timestep_info",
        })
    }

    /// Append a copy of the last entry as a placeholder for the next step.
    pub fn add_step(&mut self) -> StateResult<()> {
        let placeholder = self.last()?.clone();
        self.timestep_info.push(placeholder);
        Ok(())
    }
}

/// The simulation object shared by the driver and every collaborator.
#[derive(Clone, Debug)]
pub struct SimulationState {
    pub structure: StructuralData,
    pub aero: AeroData,
    /// Index of the outer step currently being solved
    pub ts: usize,
}

impl SimulationState {
    pub fn new(structure: StructuralData, aero: AeroData) -> StateResult<Self> {
        if let Some(&node) = aero
            .struct2aero
            .iter()
            .find(|&&node| node >= structure.num_node())
        {
            return Err(StateError::IndexOob {
                what: "struct2aero node",
                index: node,
                len: structure.num_node(),
            });
        }
        let num_vertex = aero.last()?.num_vertex();
        if aero.struct2aero.len() != num_vertex {
            return Err(StateError::Shape {
                what: "struct2aero length",
                expected: num_vertex,
                actual: aero.struct2aero.len(),
            });
        }
        Ok(Self {
            structure,
            aero,
            ts: 0,
        })
    }

    pub fn structural_history_len(&self) -> usize {
        self.structure.timestep_info.len()
    }

    pub fn aero_history_len(&self) -> usize {
        self.aero.timestep_info.len()
    }

    pub fn last_structural(&self) -> StateResult<&StructuralTimestepState> {
        self.structure.last()
    }

    pub fn last_aero(&self) -> StateResult<&AeroTimestepState> {
        self.aero.last()
    }
}

//! Contracts of the solvers driven by the coupling loop.
//!
//! The simulation state is owned by the caller and passed to every call;
//! collaborators own the content of the history entries they append.

use crate::error::{CouplingError, CouplingResult};
use fsi_state::{AeroTimestepState, SimulationState, StructuralTimestepState};
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Run-level values forwarded to collaborators at initialisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverContext {
    /// Outer timestep (seconds)
    pub dt: f64,
    /// Structural load steps per outer step
    pub structural_substeps: usize,
    /// Outer steps in this run
    pub n_time_steps: usize,
}

/// Structural dynamics solver.
pub trait StructuralSolver {
    /// Identifier for diagnostics.
    fn name(&self) -> &str;

    fn initialise(&mut self, state: &mut SimulationState, ctx: &SolverContext)
    -> CouplingResult<()>;

    /// Advance `estimate` over one outer step under its applied forces.
    fn run(
        &mut self,
        state: &mut SimulationState,
        estimate: &mut StructuralTimestepState,
    ) -> CouplingResult<()>;

    /// Append a placeholder entry to the structural history.
    fn add_step(&mut self, state: &mut SimulationState) -> CouplingResult<()> {
        state.structure.add_step()?;
        Ok(())
    }

    /// Compute load resultants for reporting.
    fn extract_resultants(&mut self, _state: &SimulationState) -> CouplingResult<()> {
        Ok(())
    }

    /// Integrate the frame-of-reference position of history entry `index`.
    fn integrate_position(
        &mut self,
        state: &mut SimulationState,
        index: usize,
        dt: f64,
    ) -> CouplingResult<()> {
        state.structure.integrate_position(index, dt)?;
        Ok(())
    }

    /// Gravitational acceleration, when the solver models it.
    fn gravity(&self) -> Option<f64> {
        None
    }

    fn set_gravity(&mut self, _g: f64) -> CouplingResult<()> {
        Err(CouplingError::collaborator(self.name(), "gravity is not supported"))
    }
}

/// Aerodynamic solver.
pub trait AeroSolver {
    /// Identifier for diagnostics.
    fn name(&self) -> &str;

    fn initialise(&mut self, state: &mut SimulationState, ctx: &SolverContext)
    -> CouplingResult<()>;

    /// Rebuild the surface grid of `aero` from the deformed structure.
    fn update_custom_grid(
        &mut self,
        state: &SimulationState,
        structural: &StructuralTimestepState,
        aero: &mut AeroTimestepState,
    ) -> CouplingResult<()>;

    /// Solve the flow on `aero`, filling its steady and dynamic forces.
    fn run(
        &mut self,
        state: &mut SimulationState,
        aero: &mut AeroTimestepState,
        structural: &StructuralTimestepState,
        convect_wake: bool,
        unsteady_contribution: bool,
    ) -> CouplingResult<()>;

    /// Append a placeholder entry to the aero history.
    fn add_step(&mut self, state: &mut SimulationState) -> CouplingResult<()> {
        state.aero.add_step()?;
        Ok(())
    }

    /// Free-stream air density, when the solver models it.
    fn air_density(&self) -> Option<f64> {
        None
    }

    fn set_air_density(&mut self, _rho: f64) -> CouplingResult<()> {
        Err(CouplingError::collaborator(self.name(), "air density is not supported"))
    }
}

/// Postprocessor invoked after every committed step.
pub trait Postprocessor {
    /// Identifier for diagnostics.
    fn name(&self) -> &str;

    fn initialise(&mut self, state: &mut SimulationState, ctx: &SolverContext)
    -> CouplingResult<()>;

    /// Process the latest committed step. `online` is true inside the time loop.
    fn run(&mut self, state: &mut SimulationState, online: bool) -> CouplingResult<()>;
}

/// Maps grid-vertex loads onto structural nodes.
pub trait ForceMapper {
    /// Return a `num_node x 6` array of nodal loads in the body frame.
    ///
    /// # Arguments
    /// * `forces` - Vertex loads, `num_vertex x 6`, inertial frame
    /// * `struct2aero` - Structural node of each vertex
    /// * `zeta` - Vertex coordinates
    /// * `pos` - Structural nodal positions
    /// * `psi` - Structural nodal orientations
    /// * `cag` - Rotation from the inertial to the body frame
    fn map(
        &self,
        forces: &DMatrix<f64>,
        struct2aero: &[usize],
        zeta: &[Vector3<f64>],
        pos: &[Vector3<f64>],
        psi: &[Vector3<f64>],
        cag: &Matrix3<f64>,
    ) -> CouplingResult<DMatrix<f64>>;
}

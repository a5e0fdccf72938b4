//! Lumped mass-spring-damper structure with Newmark time integration.

use crate::error::{SolverError, SolverResult, parse_settings};
use fsi_coupling::{CouplingResult, SolverContext, StructuralSolver};
use fsi_state::{SimulationState, StructuralTimestepState};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Newmark average-acceleration parameters.
const GAMMA: f64 = 0.5;
const BETA: f64 = 0.25;

/// Settings block for [`LumpedStructure`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LumpedStructureSettings {
    /// Mass per translational DOF (kg)
    pub mass: f64,
    /// Stiffness per translational DOF (N/m)
    pub stiffness: f64,
    /// Damping per translational DOF (N s/m)
    pub damping: f64,
    /// Nodes held at their reference position
    pub clamped_nodes: Vec<usize>,
    /// Gravitational acceleration along -z (m/s^2)
    pub gravity: f64,
}

impl Default for LumpedStructureSettings {
    fn default() -> Self {
        Self {
            mass: 1.0,
            stiffness: 100.0,
            damping: 0.5,
            clamped_nodes: Vec::new(),
            gravity: 0.0,
        }
    }
}

/// Independent 3-DOF oscillator at every structural node.
///
/// Generalized coordinates are the stacked nodal displacements from the
/// reference configuration, `q[3 * node + axis]`.
#[derive(Debug, Clone)]
pub struct LumpedStructure {
    settings: LumpedStructureSettings,
    ref_pos: Vec<Vector3<f64>>,
    dt: f64,
    substeps: usize,
    last_resultant: Vector3<f64>,
}

impl LumpedStructure {
    pub const ID: &'static str = "LumpedStructure";

    pub fn new(settings: LumpedStructureSettings) -> SolverResult<Self> {
        if settings.mass.is_nan() || settings.mass <= 0.0 {
            return Err(invalid("mass must be positive"));
        }
        if settings.stiffness < 0.0 || settings.damping < 0.0 {
            return Err(invalid("stiffness and damping must be non-negative"));
        }
        if !settings.gravity.is_finite() {
            return Err(invalid("gravity must be finite"));
        }
        Ok(Self {
            settings,
            ref_pos: Vec::new(),
            dt: 0.0,
            substeps: 1,
            last_resultant: Vector3::zeros(),
        })
    }

    pub fn from_value(value: &serde_json::Value) -> SolverResult<Self> {
        Self::new(parse_settings(Self::ID, value)?)
    }

    /// Total applied force of the last committed step, from `extract_resultants`.
    pub fn last_resultant(&self) -> Vector3<f64> {
        self.last_resultant
    }

    fn is_clamped(&self, node: usize) -> bool {
        self.settings.clamped_nodes.contains(&node)
    }

    /// One Newmark step of size `h` for a single DOF.
    fn newmark(&self, h: f64, force: f64, u: f64, v: f64, a: f64) -> (f64, f64, f64) {
        let (m, c, k) = (
            self.settings.mass,
            self.settings.damping,
            self.settings.stiffness,
        );
        let k_eff = k + GAMMA / (BETA * h) * c + m / (BETA * h * h);
        let p_eff = force
            + m * (u / (BETA * h * h) + v / (BETA * h) + (0.5 / BETA - 1.0) * a)
            + c * (GAMMA / (BETA * h) * u
                + (GAMMA / BETA - 1.0) * v
                + h * (0.5 * GAMMA / BETA - 1.0) * a);
        let u1 = p_eff / k_eff;
        let a1 = (u1 - u) / (BETA * h * h) - v / (BETA * h) - (0.5 / BETA - 1.0) * a;
        let v1 = v + h * ((1.0 - GAMMA) * a + GAMMA * a1);
        (u1, v1, a1)
    }
}

impl StructuralSolver for LumpedStructure {
    fn name(&self) -> &str {
        Self::ID
    }

    fn initialise(&mut self, state: &mut SimulationState, ctx: &SolverContext) -> CouplingResult<()> {
        let ini = &state.structure.ini_info;
        let num_node = ini.num_node();
        if ini.q.len() != 3 * num_node {
            return Err(invalid(format!(
                "expected {} generalized coordinates for {num_node} nodes, got {}",
                3 * num_node,
                ini.q.len()
            ))
            .into());
        }
        if let Some(node) = self.settings.clamped_nodes.iter().find(|n| **n >= num_node) {
            return Err(invalid(format!("clamped node {node} out of range")).into());
        }
        self.ref_pos = (0..num_node)
            .map(|i| ini.pos[i] - Vector3::new(ini.q[3 * i], ini.q[3 * i + 1], ini.q[3 * i + 2]))
            .collect();
        self.dt = ctx.dt;
        self.substeps = ctx.structural_substeps.max(1);
        Ok(())
    }

    fn run(
        &mut self,
        _state: &mut SimulationState,
        estimate: &mut StructuralTimestepState,
    ) -> CouplingResult<()> {
        let h = self.dt / self.substeps as f64;
        for node in 0..self.ref_pos.len() {
            for axis in 0..3 {
                let dof = 3 * node + axis;
                if self.is_clamped(node) {
                    estimate.q[dof] = 0.0;
                    estimate.dqdt[dof] = 0.0;
                    estimate.dqddt[dof] = 0.0;
                    continue;
                }
                let mut force = estimate.steady_applied_forces[(node, axis)]
                    + estimate.unsteady_applied_forces[(node, axis)];
                if axis == 2 {
                    force -= self.settings.mass * self.settings.gravity;
                }
                let (mut u, mut v, mut a) = (estimate.q[dof], estimate.dqdt[dof], estimate.dqddt[dof]);
                for _ in 0..self.substeps {
                    (u, v, a) = self.newmark(h, force, u, v, a);
                }
                estimate.q[dof] = u;
                estimate.dqdt[dof] = v;
                estimate.dqddt[dof] = a;
            }
            estimate.pos[node] = self.ref_pos[node]
                + Vector3::new(
                    estimate.q[3 * node],
                    estimate.q[3 * node + 1],
                    estimate.q[3 * node + 2],
                );
        }
        Ok(())
    }

    fn extract_resultants(&mut self, state: &SimulationState) -> CouplingResult<()> {
        let last = state.last_structural()?;
        let total = &last.steady_applied_forces + &last.unsteady_applied_forces;
        self.last_resultant = Vector3::new(
            total.column(0).sum(),
            total.column(1).sum(),
            total.column(2).sum(),
        );
        debug!(ts = state.ts, resultant = ?self.last_resultant, "structural resultants");
        Ok(())
    }

    fn gravity(&self) -> Option<f64> {
        Some(self.settings.gravity)
    }

    fn set_gravity(&mut self, g: f64) -> CouplingResult<()> {
        if !g.is_finite() {
            return Err(invalid("gravity must be finite").into());
        }
        self.settings.gravity = g;
        Ok(())
    }
}

fn invalid(what: impl Into<String>) -> SolverError {
    SolverError::Settings {
        solver: LumpedStructure::ID,
        message: what.into(),
    }
}

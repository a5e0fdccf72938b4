//! Quasi-steady strip aerodynamics on the grid vertices.

use crate::error::{SolverError, SolverResult, parse_settings};
use fsi_core::units::{Force, dynamic_pressure, kgpm3, m2, mps};
use fsi_coupling::{AeroSolver, CouplingResult, SolverContext};
use fsi_state::{AeroTimestepState, SimulationState, StructuralTimestepState};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uom::si::force::newton;

/// Settings block for [`QuasiSteadyAero`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuasiSteadyAeroSettings {
    /// Air density (kg/m^3)
    pub rho: f64,
    /// Free-stream speed along body x (m/s)
    pub u_inf: f64,
    /// Lift-curve slope (1/rad)
    pub lift_slope: f64,
    /// Geometric angle of attack (deg)
    pub alpha0_deg: f64,
    /// Lifting area attributed to each vertex (m^2)
    pub vertex_area: f64,
    /// Apparent mass attributed to each vertex (kg)
    pub apparent_mass: f64,
    /// Rows of shed vertices kept in the wake
    pub wake_rows: usize,
}

impl Default for QuasiSteadyAeroSettings {
    fn default() -> Self {
        Self {
            rho: 1.225,
            u_inf: 10.0,
            lift_slope: 2.0 * std::f64::consts::PI,
            alpha0_deg: 2.0,
            vertex_area: 0.1,
            apparent_mass: 0.05,
            wake_rows: 10,
        }
    }
}

/// Lift from the local angle of attack, including the plunge velocity.
///
/// The plunge velocity of a vertex is the backward difference of its node's
/// vertical position against the last committed structural step. The
/// unsteady load is an apparent-mass reaction to the plunge acceleration.
#[derive(Debug, Clone)]
pub struct QuasiSteadyAero {
    settings: QuasiSteadyAeroSettings,
    ref_zeta: Vec<Vector3<f64>>,
    ref_pos: Vec<Vector3<f64>>,
    dt: f64,
}

impl QuasiSteadyAero {
    pub const ID: &'static str = "QuasiSteadyAero";

    pub fn new(settings: QuasiSteadyAeroSettings) -> SolverResult<Self> {
        if settings.u_inf.is_nan() || settings.u_inf <= 0.0 {
            return Err(invalid("u_inf must be positive"));
        }
        if settings.rho.is_nan() || settings.rho <= 0.0 {
            return Err(invalid("rho must be positive"));
        }
        if settings.vertex_area < 0.0 || settings.apparent_mass < 0.0 {
            return Err(invalid("vertex_area and apparent_mass must be non-negative"));
        }
        Ok(Self {
            settings,
            ref_zeta: Vec::new(),
            ref_pos: Vec::new(),
            dt: 0.0,
        })
    }

    pub fn from_value(value: &serde_json::Value) -> SolverResult<Self> {
        Self::new(parse_settings(Self::ID, value)?)
    }

    /// Vertical lift of one vertex plunging at `w`.
    fn lift(&self, w: f64) -> f64 {
        let s = &self.settings;
        let q = dynamic_pressure(kgpm3(s.rho), mps(s.u_inf));
        let alpha = s.alpha0_deg.to_radians() - w / s.u_inf;
        let reference: Force = q * m2(s.vertex_area);
        reference.get::<newton>() * s.lift_slope * alpha
    }

    fn convect_wake(&self, aero: &mut AeroTimestepState) {
        let shift = Vector3::new(self.settings.u_inf * self.dt, 0.0, 0.0);
        for p in aero.wake.iter_mut() {
            *p += shift;
        }
        aero.wake.extend(aero.zeta.iter().copied());
        let max_len = self.settings.wake_rows * aero.zeta.len();
        if aero.wake.len() > max_len {
            let excess = aero.wake.len() - max_len;
            aero.wake.drain(..excess);
        }
    }
}

impl AeroSolver for QuasiSteadyAero {
    fn name(&self) -> &str {
        Self::ID
    }

    fn initialise(&mut self, state: &mut SimulationState, ctx: &SolverContext) -> CouplingResult<()> {
        self.ref_zeta = state.last_aero()?.zeta.clone();
        self.ref_pos = state.last_structural()?.pos.clone();
        self.dt = ctx.dt;
        Ok(())
    }

    fn update_custom_grid(
        &mut self,
        state: &SimulationState,
        structural: &StructuralTimestepState,
        aero: &mut AeroTimestepState,
    ) -> CouplingResult<()> {
        if structural.pos.len() != self.ref_pos.len() {
            return Err(invalid("structural node count changed since initialise").into());
        }
        for (v, zeta) in aero.zeta.iter_mut().enumerate() {
            let node = state.aero.struct2aero[v];
            *zeta = self.ref_zeta[v] + (structural.pos[node] - self.ref_pos[node]);
        }
        Ok(())
    }

    fn run(
        &mut self,
        state: &mut SimulationState,
        aero: &mut AeroTimestepState,
        structural: &StructuralTimestepState,
        convect_wake: bool,
        unsteady_contribution: bool,
    ) -> CouplingResult<()> {
        let history = &state.structure.timestep_info;
        let committed = state.last_structural()?;
        let before_committed = history.len().checked_sub(2).map(|i| &history[i]);

        aero.forces.fill(0.0);
        aero.dynamic_forces.fill(0.0);
        for v in 0..aero.num_vertex() {
            let node = state.aero.struct2aero[v];
            let w = (structural.pos[node].z - committed.pos[node].z) / self.dt;
            aero.forces[(v, 2)] = self.lift(w);
            if unsteady_contribution {
                let w_committed = before_committed
                    .map_or(0.0, |prev| (committed.pos[node].z - prev.pos[node].z) / self.dt);
                let accel = (w - w_committed) / self.dt;
                aero.dynamic_forces[(v, 2)] = -self.settings.apparent_mass * accel;
            }
        }

        if convect_wake {
            self.convect_wake(aero);
        }
        Ok(())
    }

    fn air_density(&self) -> Option<f64> {
        Some(self.settings.rho)
    }

    fn set_air_density(&mut self, rho: f64) -> CouplingResult<()> {
        if rho.is_nan() || rho <= 0.0 {
            return Err(invalid("rho must be positive").into());
        }
        self.settings.rho = rho;
        Ok(())
    }
}

fn invalid(what: impl Into<String>) -> SolverError {
    SolverError::Settings {
        solver: QuasiSteadyAero::ID,
        message: what.into(),
    }
}

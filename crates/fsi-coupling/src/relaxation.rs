//! Under-relaxation of applied forces between fixed-point substeps.

use crate::error::{CouplingError, CouplingResult};
use crate::settings::CouplingSettings;
use fsi_core::lerp;
use fsi_state::StructuralTimestepState;
use nalgebra::DMatrix;

/// Ramp applied to the unsteady aerodynamic forces over the first substeps.
pub const UNSTEADY_RAMP: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Outer steps during which the unsteady contribution stays switched off.
pub const UNSTEADY_STARTUP_STEPS: usize = 5;

/// Maps a substep index to a relaxation coefficient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelaxationScheduler {
    pub dynamic: bool,
    pub initial: f64,
    pub final_factor: f64,
    pub steps: usize,
}

impl RelaxationScheduler {
    pub fn from_settings(settings: &CouplingSettings) -> Self {
        Self {
            dynamic: settings.dynamic_relaxation,
            initial: settings.relaxation_factor,
            final_factor: settings.final_relaxation_factor,
            steps: settings.relaxation_steps,
        }
    }

    /// Coefficient for substep `k`.
    ///
    /// Linear from `initial` at `k = 0` to `final_factor` at `k = steps`,
    /// constant afterwards. Constant `initial` when dynamic relaxation is off.
    pub fn factor(&self, k: usize) -> f64 {
        if !self.dynamic {
            return self.initial;
        }
        if k >= self.steps {
            return self.final_factor;
        }
        lerp(self.initial, self.final_factor, k as f64 / self.steps as f64)
    }
}

/// Convex blending of a new force estimate with the previous one.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForceRelaxer;

impl ForceRelaxer {
    /// Replace the forces of `current` by `(1 - coeff) * current + coeff * previous`.
    ///
    /// Applies to both the steady and the unsteady applied-force arrays.
    pub fn relax(
        &self,
        current: &mut StructuralTimestepState,
        previous: &StructuralTimestepState,
        coeff: f64,
    ) -> CouplingResult<()> {
        blend(
            &mut current.steady_applied_forces,
            &previous.steady_applied_forces,
            coeff,
            "steady_applied_forces",
        )?;
        blend(
            &mut current.unsteady_applied_forces,
            &previous.unsteady_applied_forces,
            coeff,
            "unsteady_applied_forces",
        )
    }
}

fn blend(
    current: &mut DMatrix<f64>,
    previous: &DMatrix<f64>,
    coeff: f64,
    what: &str,
) -> CouplingResult<()> {
    if current.shape() != previous.shape() {
        return Err(CouplingError::Shape {
            what: format!(
                "{what}: current {:?} vs previous {:?}",
                current.shape(),
                previous.shape()
            ),
        });
    }
    current.zip_apply(previous, |c, p| *c = (1.0 - coeff) * *c + coeff * p);
    Ok(())
}

/// Scaling of the unsteady aerodynamic forces at substep `k` of outer step `ts`.
///
/// Indices past the ramp table saturate at 1.
pub fn unsteady_force_coefficient(enabled: bool, k: usize, ts: usize) -> f64 {
    if !enabled || ts < UNSTEADY_STARTUP_STEPS {
        return 0.0;
    }
    UNSTEADY_RAMP.get(k).copied().unwrap_or(1.0)
}

/// Coefficient suggested for substeps close to the budget.
///
/// The driver evaluates this after the blend of the same substep has
/// already been applied, so it never changes the forces.
pub fn late_substep_override(k: usize, fsi_substeps: usize) -> Option<f64> {
    let k = k as f64;
    let budget = fsi_substeps as f64;
    if k > 0.9 * budget {
        Some(0.3)
    } else if k > 0.8 * budget {
        Some(0.8)
    } else {
        None
    }
}

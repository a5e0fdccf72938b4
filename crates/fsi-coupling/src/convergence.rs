//! Normalized-residual convergence test for the fixed-point substeps.

use crate::error::{CouplingError, CouplingResult};
use crate::relaxation::UNSTEADY_RAMP;
use fsi_core::{diff_norm, ensure_all_finite};
use fsi_state::StructuralTimestepState;

/// Norms recorded at substep 0, used to normalize later residuals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConvergenceBaseline {
    pub base_q: f64,
    pub base_dqdt: f64,
    pub base_dqddt: f64,
}

/// Last relative residuals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Residuals {
    pub q: f64,
    pub dqdt: f64,
    /// Reported only, never part of the stop decision
    pub dqddt: f64,
}

/// Convergence criteria taken from the coupling settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvergenceCriteria {
    pub tolerance: f64,
    pub minimum_steps: usize,
    pub include_unsteady_force_contribution: bool,
}

/// Decides when the substep iteration of one outer step may stop.
#[derive(Clone, Debug)]
pub struct ConvergenceMonitor {
    criteria: ConvergenceCriteria,
    baseline: Option<ConvergenceBaseline>,
    residuals: Residuals,
    /// Whether `residuals` was computed since the last reset
    fresh: bool,
    /// Outer step, used in the divergence error only
    ts: usize,
}

impl ConvergenceMonitor {
    pub fn new(criteria: ConvergenceCriteria) -> Self {
        Self {
            criteria,
            baseline: None,
            residuals: Residuals::default(),
            fresh: false,
            ts: 0,
        }
    }

    /// Forget the baseline before the substeps of outer step `ts`.
    pub fn reset(&mut self, ts: usize) {
        self.baseline = None;
        self.fresh = false;
        self.ts = ts;
    }

    pub fn baseline(&self) -> Option<ConvergenceBaseline> {
        self.baseline
    }

    /// Last computed residuals, possibly from an earlier outer step.
    pub fn residuals(&self) -> Residuals {
        self.residuals
    }

    /// Residuals computed during the current outer step, if any.
    pub fn step_residuals(&self) -> Option<Residuals> {
        self.fresh.then_some(self.residuals)
    }

    /// Evaluate substep `k`, comparing `current` against `previous`.
    ///
    /// Returns `Ok(true)` once converged. A non-finite entry in `current.q`
    /// is a `Divergence` error regardless of `k`.
    pub fn evaluate(
        &mut self,
        k: usize,
        current: &StructuralTimestepState,
        previous: &StructuralTimestepState,
    ) -> CouplingResult<bool> {
        if ensure_all_finite(&current.q, "q").is_err() {
            return Err(CouplingError::Divergence {
                ts: self.ts,
                substep: k,
            });
        }

        if k == 0 {
            self.baseline = Some(ConvergenceBaseline {
                base_q: current.q.norm(),
                base_dqdt: current.dqdt.norm(),
                base_dqddt: current.dqddt.norm(),
            });
            return Ok(false);
        }

        // Not before the unsteady forces are fully ramped in.
        if self.criteria.include_unsteady_force_contribution && k < UNSTEADY_RAMP.len() {
            return Ok(false);
        }

        let baseline = self.baseline.ok_or_else(|| CouplingError::History {
            what: format!("no convergence baseline recorded before substep {k}"),
        })?;

        self.residuals = Residuals {
            q: diff_norm(&current.q, &previous.q, "q")? / baseline.base_q,
            dqdt: diff_norm(&current.dqdt, &previous.dqdt, "dqdt")? / baseline.base_dqdt,
            dqddt: diff_norm(&current.dqddt, &previous.dqddt, "dqddt")? / baseline.base_dqddt,
        };
        self.fresh = true;

        let tol = self.criteria.tolerance;
        Ok(k + 1 > self.criteria.minimum_steps
            && self.residuals.q < tol
            && self.residuals.dqdt < tol)
    }
}

//! Time marching with fixed-point coupling between aero and structure.

use crate::collaborators::{AeroSolver, ForceMapper, Postprocessor, SolverContext, StructuralSolver};
use crate::convergence::{ConvergenceCriteria, ConvergenceMonitor, Residuals};
use crate::error::{CouplingError, CouplingResult};
use crate::history::TimestepHistoryManager;
use crate::progress::{ProgressRecord, ResidualTable};
use crate::registry::SolverRegistry;
use crate::relaxation::{
    ForceRelaxer, RelaxationScheduler, late_substep_override, unsteady_force_coefficient,
};
use crate::settings::CouplingSettings;
use fsi_core::units::{Time, s};
use fsi_state::{AeroTimestepState, SimulationState, StructuralTimestepState};
use nalgebra::DMatrix;
use tracing::{debug, info, trace, warn};

/// Outcome of one outer step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub ts: usize,
    pub time: Time,
    /// Substep index at which the inner loop stopped
    pub substeps: usize,
    pub converged: bool,
    /// `None` when no residual was computed during this step
    pub residuals: Option<Residuals>,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouplingSummary {
    pub steps: Vec<StepReport>,
}

impl CouplingSummary {
    /// Steps that exhausted the substep budget or never evaluated a residual.
    pub fn non_converged(&self) -> usize {
        self.steps.iter().filter(|s| !s.converged).count()
    }
}

/// Drives the outer time loop and the inner fixed-point substeps.
///
/// Per outer step: rebuild the aero grid from the structural estimate, solve
/// the flow, map and relax the loads, solve the structure, and test
/// convergence; then commit the final iterate and run the postprocessors.
pub struct CouplingOrchestrator {
    settings: CouplingSettings,
    structural: Box<dyn StructuralSolver>,
    aero: Box<dyn AeroSolver>,
    postprocessors: Vec<Box<dyn Postprocessor>>,
    force_mapper: Box<dyn ForceMapper>,
    scheduler: RelaxationScheduler,
    relaxer: ForceRelaxer,
    monitor: ConvergenceMonitor,
    history: TimestepHistoryManager,
    table: ResidualTable,
}

impl CouplingOrchestrator {
    /// Resolve and initialise every collaborator named in `settings`.
    ///
    /// Trims `state` to its last entry first when `cleanup_previous_solution`
    /// is set.
    pub fn initialise(
        settings: CouplingSettings,
        registry: &SolverRegistry,
        state: &mut SimulationState,
    ) -> CouplingResult<Self> {
        settings.validate()?;

        let history = TimestepHistoryManager;
        if settings.cleanup_previous_solution {
            history.cleanup(state);
        }
        history.check_aligned(state)?;

        let ctx = SolverContext {
            dt: settings.dt,
            structural_substeps: settings.structural_substeps,
            n_time_steps: settings.n_time_steps,
        };

        let mut structural =
            registry.structural(&settings.structural_solver, &settings.structural_solver_settings)?;
        structural.initialise(state, &ctx)?;

        let mut aero = registry.aero(&settings.aero_solver, &settings.aero_solver_settings)?;
        aero.initialise(state, &ctx)?;

        let mut postprocessors = Vec::with_capacity(settings.postprocessors.len());
        for id in &settings.postprocessors {
            let mut pp = registry.postprocessor(id, &settings.postprocessor_settings(id))?;
            pp.initialise(state, &ctx)?;
            postprocessors.push(pp);
        }

        let force_mapper = registry.force_mapper()?;

        let monitor = ConvergenceMonitor::new(ConvergenceCriteria {
            tolerance: settings.fsi_tolerance,
            minimum_steps: settings.minimum_steps,
            include_unsteady_force_contribution: settings.include_unsteady_force_contribution,
        });

        let table = ResidualTable::default();
        if settings.print_info {
            info!("\n{}", table.header());
        }

        Ok(Self {
            scheduler: RelaxationScheduler::from_settings(&settings),
            settings,
            structural,
            aero,
            postprocessors,
            force_mapper,
            relaxer: ForceRelaxer,
            monitor,
            history,
            table,
        })
    }

    pub fn settings(&self) -> &CouplingSettings {
        &self.settings
    }

    pub fn gravity(&self) -> Option<f64> {
        self.structural.gravity()
    }

    pub fn set_gravity(&mut self, g: f64) -> CouplingResult<()> {
        self.structural.set_gravity(g)
    }

    pub fn air_density(&self) -> Option<f64> {
        self.aero.air_density()
    }

    pub fn set_air_density(&mut self, rho: f64) -> CouplingResult<()> {
        self.aero.set_air_density(rho)
    }

    /// March `n_time_steps` outer steps.
    pub fn run(&mut self, state: &mut SimulationState) -> CouplingResult<CouplingSummary> {
        self.run_with_progress(state, None)
    }

    /// March `n_time_steps` outer steps, handing every progress record to `progress_cb`.
    ///
    /// Step numbering continues from the current history length. A
    /// `Divergence` error aborts the run at once.
    pub fn run_with_progress(
        &mut self,
        state: &mut SimulationState,
        mut progress_cb: Option<&mut dyn FnMut(&ProgressRecord)>,
    ) -> CouplingResult<CouplingSummary> {
        self.history.check_aligned(state)?;
        let first = state.structural_history_len();
        let last = first + self.settings.n_time_steps;
        info!(first, n_time_steps = self.settings.n_time_steps, "starting coupled time marching");

        let mut summary = CouplingSummary::default();
        for ts in first..last {
            state.ts = ts;
            let report = self.step(state, ts, &mut progress_cb)?;
            summary.steps.push(report);
        }

        if self.settings.print_info {
            info!("...Finished");
        }
        Ok(summary)
    }

    fn step(
        &mut self,
        state: &mut SimulationState,
        ts: usize,
        progress_cb: &mut Option<&mut dyn FnMut(&ProgressRecord)>,
    ) -> CouplingResult<StepReport> {
        let budget = self.settings.fsi_substeps;
        self.monitor.reset(ts);

        let mut structural_estimate = state.last_structural()?.clone();
        let mut aero_estimate = state.last_aero()?.clone();
        let mut k = 0;
        let mut converged = false;

        for substep in 0..=budget {
            k = substep;
            if k == budget && budget != 0 {
                warn!(ts, substeps = k, "The FSI solver did not converge");
                break;
            }

            aero_estimate = state.last_aero()?.clone();
            self.aero
                .update_custom_grid(state, &structural_estimate, &mut aero_estimate)?;

            let force_coeff = unsteady_force_coefficient(
                self.settings.include_unsteady_force_contribution,
                k,
                ts,
            );
            let unsteady_contribution = force_coeff != 0.0;

            let previous_estimate = structural_estimate.clone();
            self.aero.run(
                state,
                &mut aero_estimate,
                &structural_estimate,
                true,
                unsteady_contribution,
            )?;

            structural_estimate = state.last_structural()?.clone();
            self.map_forces(state, &aero_estimate, &mut structural_estimate, force_coeff)?;

            let relax_coeff = self.scheduler.factor(k);
            self.relaxer
                .relax(&mut structural_estimate, &previous_estimate, relax_coeff)?;

            // Evaluated after the blend above, so it does not alter this substep.
            if let Some(late) = late_substep_override(k, budget) {
                trace!(ts, k, relax_coeff, late, "late-substep relaxation override");
            }

            self.structural.run(state, &mut structural_estimate)?;

            converged = self
                .monitor
                .evaluate(k, &structural_estimate, &previous_estimate)?;
            debug!(ts, k, force_coeff, relax_coeff, converged, residuals = ?self.monitor.residuals(), "substep");
            if converged {
                break;
            }
        }

        self.commit(state, &aero_estimate, &structural_estimate)?;

        let residuals = self.monitor.residuals();
        let record = ProgressRecord {
            ts,
            time: s(ts as f64 * self.settings.dt),
            substeps: k,
            log10_res_dqdt: residuals.dqdt.log10(),
            for_vel_x: structural_estimate.for_vel[0],
            for_vel_z: structural_estimate.for_vel[2],
            force_x: structural_estimate.total_steady_force(0),
            force_z: structural_estimate.total_steady_force(2),
        };
        if self.settings.print_info {
            info!("{}", self.table.line(&record));
        }
        if let Some(cb) = progress_cb.as_deref_mut() {
            cb(&record);
        }

        self.structural.extract_resultants(state)?;
        for pp in &mut self.postprocessors {
            pp.run(state, true)?;
        }

        Ok(StepReport {
            ts,
            time: record.time,
            substeps: k,
            converged,
            residuals: self.monitor.step_residuals(),
        })
    }

    /// Append one entry per history and fill it with the final iterate.
    fn commit(
        &mut self,
        state: &mut SimulationState,
        aero: &AeroTimestepState,
        structural: &StructuralTimestepState,
    ) -> CouplingResult<()> {
        self.aero.add_step(state)?;
        self.structural.add_step(state)?;
        self.history.commit(state, aero, structural)?;
        self.history.check_aligned(state)?;

        let last = state.structural_history_len() - 1;
        self.structural
            .integrate_position(state, last, self.settings.dt)
    }

    /// Replace the estimate's loads with mapped aero loads plus prescribed loads.
    fn map_forces(
        &self,
        state: &SimulationState,
        aero: &AeroTimestepState,
        structural: &mut StructuralTimestepState,
        unsteady_forces_coeff: f64,
    ) -> CouplingResult<()> {
        let cag = structural.cag();
        let struct2aero = &state.aero.struct2aero;

        let struct_forces = self.force_mapper.map(
            &aero.forces,
            struct2aero,
            &aero.zeta,
            &structural.pos,
            &structural.psi,
            &cag,
        )?;
        let dynamic_struct_forces = self.force_mapper.map(
            &aero.dynamic_forces,
            struct2aero,
            &aero.zeta,
            &structural.pos,
            &structural.psi,
            &cag,
        )? * unsteady_forces_coeff;

        let prescribed_dynamic = state
            .structure
            .prescribed_dynamic_forces(state.ts.saturating_sub(1));

        structural.steady_applied_forces = add_checked(
            struct_forces,
            &state.structure.ini_info.steady_applied_forces,
            "steady_applied_forces",
        )?;
        structural.unsteady_applied_forces = add_checked(
            dynamic_struct_forces,
            &prescribed_dynamic,
            "unsteady_applied_forces",
        )?;
        Ok(())
    }
}

fn add_checked(a: DMatrix<f64>, b: &DMatrix<f64>, what: &str) -> CouplingResult<DMatrix<f64>> {
    if a.shape() != b.shape() {
        return Err(CouplingError::Shape {
            what: format!("{what}: mapped {:?} vs prescribed {:?}", a.shape(), b.shape()),
        });
    }
    Ok(a + b)
}

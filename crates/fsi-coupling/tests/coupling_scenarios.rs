//! Coupled time-marching scenarios with deterministic stub solvers.

use fsi_coupling::{
    AeroSolver, CouplingError, CouplingOrchestrator, CouplingResult, CouplingSettings, ForceMapper,
    Postprocessor, ProgressRecord, SolverContext, SolverRegistry, StructuralSolver,
};
use fsi_state::{
    AeroData, AeroTimestepState, SimulationState, StructuralData, StructuralTimestepState,
};
use nalgebra::{DMatrix, Matrix3, Vector3};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const NUM_NODE: usize = 2;
const NUM_VERTEX: usize = 4;

/// Call counters and recorded arguments shared with the test body.
#[derive(Default)]
struct Recorder {
    aero_runs: Cell<usize>,
    structural_runs: Cell<usize>,
    grid_updates: Cell<usize>,
    unsteady_flags: RefCell<Vec<(usize, bool)>>,
    postprocessor_calls: RefCell<Vec<(String, usize)>>,
    /// Steady load on node 0 seen by each structural run
    node0_loads: RefCell<Vec<f64>>,
}

/// Aero stub: constant vertical load, optionally varying with the call count.
struct StubAero {
    calls: Rc<Recorder>,
    lift: f64,
    decay: f64,
    rho: f64,
}

impl AeroSolver for StubAero {
    fn name(&self) -> &str {
        "StubAero"
    }

    fn initialise(&mut self, _state: &mut SimulationState, _ctx: &SolverContext) -> CouplingResult<()> {
        Ok(())
    }

    fn update_custom_grid(
        &mut self,
        _state: &SimulationState,
        structural: &StructuralTimestepState,
        aero: &mut AeroTimestepState,
    ) -> CouplingResult<()> {
        self.calls.grid_updates.set(self.calls.grid_updates.get() + 1);
        for (i, z) in aero.zeta.iter_mut().enumerate() {
            *z = structural.pos[i % NUM_NODE];
        }
        Ok(())
    }

    fn run(
        &mut self,
        state: &mut SimulationState,
        aero: &mut AeroTimestepState,
        _structural: &StructuralTimestepState,
        convect_wake: bool,
        unsteady_contribution: bool,
    ) -> CouplingResult<()> {
        assert!(convect_wake);
        let n = self.calls.aero_runs.get();
        self.calls.aero_runs.set(n + 1);
        self.calls
            .unsteady_flags
            .borrow_mut()
            .push((state.ts, unsteady_contribution));
        let lift = self.lift * (1.0 + self.decay.powi(n as i32 + 1));
        aero.forces.fill(0.0);
        aero.dynamic_forces.fill(0.0);
        for v in 0..aero.forces.nrows() {
            aero.forces[(v, 2)] = lift;
            aero.dynamic_forces[(v, 2)] = 1.0;
        }
        Ok(())
    }

    fn air_density(&self) -> Option<f64> {
        Some(self.rho)
    }

    fn set_air_density(&mut self, rho: f64) -> CouplingResult<()> {
        self.rho = rho;
        Ok(())
    }
}

/// Structure stub: state is an affine function of the total applied load.
struct StubStructure {
    calls: Rc<Recorder>,
    diverge_at: Option<usize>,
}

impl StructuralSolver for StubStructure {
    fn name(&self) -> &str {
        "StubStructure"
    }

    fn initialise(&mut self, _state: &mut SimulationState, _ctx: &SolverContext) -> CouplingResult<()> {
        Ok(())
    }

    fn run(
        &mut self,
        state: &mut SimulationState,
        estimate: &mut StructuralTimestepState,
    ) -> CouplingResult<()> {
        self.calls
            .structural_runs
            .set(self.calls.structural_runs.get() + 1);
        self.calls
            .node0_loads
            .borrow_mut()
            .push(estimate.steady_applied_forces[(0, 2)]);
        let load = estimate.total_steady_force(2) + estimate.unsteady_applied_forces.column(2).sum();
        estimate.q.fill(1.0 + 0.01 * load);
        estimate.dqdt.fill(0.5 + 0.01 * load);
        estimate.dqddt.fill(0.25);
        if self.diverge_at == Some(state.ts) {
            estimate.q[0] = f64::NAN;
        }
        Ok(())
    }
}

struct SumMapper;

impl ForceMapper for SumMapper {
    fn map(
        &self,
        forces: &DMatrix<f64>,
        struct2aero: &[usize],
        _zeta: &[Vector3<f64>],
        pos: &[Vector3<f64>],
        _psi: &[Vector3<f64>],
        _cag: &Matrix3<f64>,
    ) -> CouplingResult<DMatrix<f64>> {
        let mut out = DMatrix::zeros(pos.len(), 6);
        for (v, node) in struct2aero.iter().enumerate() {
            for c in 0..6 {
                out[(*node, c)] += forces[(v, c)];
            }
        }
        Ok(out)
    }
}

struct RecordingPostprocessor {
    id: String,
    calls: Rc<Recorder>,
}

impl Postprocessor for RecordingPostprocessor {
    fn name(&self) -> &str {
        &self.id
    }

    fn initialise(&mut self, _state: &mut SimulationState, _ctx: &SolverContext) -> CouplingResult<()> {
        Ok(())
    }

    fn run(&mut self, state: &mut SimulationState, online: bool) -> CouplingResult<()> {
        assert!(online);
        self.calls
            .postprocessor_calls
            .borrow_mut()
            .push((self.id.clone(), state.structural_history_len()));
        Ok(())
    }
}

fn registry(calls: &Rc<Recorder>, decay: f64, diverge_at: Option<usize>) -> SolverRegistry {
    let mut reg = SolverRegistry::new();
    let p = calls.clone();
    reg.register_aero("StubAero", move |_| {
        Ok(Box::new(StubAero {
            calls: p.clone(),
            lift: 2.0,
            decay,
            rho: 1.225,
        }))
    });
    let p = calls.clone();
    reg.register_structural("StubStructure", move |_| {
        Ok(Box::new(StubStructure {
            calls: p.clone(),
            diverge_at,
        }))
    });
    for id in ["First", "Second"] {
        let p = calls.clone();
        reg.register_postprocessor(id, move |_| {
            Ok(Box::new(RecordingPostprocessor {
                id: id.to_string(),
                calls: p.clone(),
            }))
        });
    }
    reg.set_force_mapper(|| Box::new(SumMapper));
    reg
}

fn seed_state() -> SimulationState {
    let mut ini = StructuralTimestepState::new(NUM_NODE, 3 * NUM_NODE);
    ini.pos = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
    ini.q.fill(1.0);
    ini.dqdt.fill(0.5);
    ini.for_vel[0] = 10.0;
    let structure = StructuralData::new(ini);
    let aero = AeroData::new(AeroTimestepState::new(NUM_VERTEX), vec![0, 1, 0, 1]);
    SimulationState::new(structure, aero).unwrap()
}

fn settings() -> CouplingSettings {
    CouplingSettings {
        print_info: false,
        structural_solver: "StubStructure".to_string(),
        aero_solver: "StubAero".to_string(),
        n_time_steps: 1,
        fsi_substeps: 3,
        minimum_steps: 1,
        fsi_tolerance: 1e-5,
        dynamic_relaxation: false,
        relaxation_factor: 0.0,
        ..CouplingSettings::default()
    }
}

#[test]
fn identical_loads_converge_at_first_substep() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();

    let mut orch = CouplingOrchestrator::initialise(settings(), &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();

    assert_eq!(summary.steps.len(), 1);
    let step = &summary.steps[0];
    assert_eq!(step.ts, 1);
    assert_eq!(step.substeps, 1);
    assert!(step.converged);
    assert_eq!(step.residuals.map(|r| r.q), Some(0.0));
    assert_eq!(calls.aero_runs.get(), 2);
    assert_eq!(calls.structural_runs.get(), 2);
    assert_eq!(state.structural_history_len(), 2);
    assert_eq!(state.aero_history_len(), 2);

    // 4 vertices x 2.0 N of steady lift, committed as the last entry.
    let committed = state.last_structural().unwrap();
    assert!((committed.total_steady_force(2) - 8.0).abs() < 1e-12);
    assert!((committed.q[0] - 1.08).abs() < 1e-12);
    // Frame of reference advanced by for_vel * dt.
    assert!((committed.for_pos[0] - 10.0 * 0.05).abs() < 1e-12);
    assert_eq!(state.structure.timestep_info[0].for_pos[0], 0.0);
}

#[test]
fn zero_substep_budget_runs_single_substep() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.5, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        fsi_substeps: 0,
        n_time_steps: 3,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();

    assert_eq!(calls.aero_runs.get(), 3);
    assert_eq!(calls.structural_runs.get(), 3);
    assert!(summary.steps.iter().all(|s| s.substeps == 0 && !s.converged));
    assert!(summary.steps.iter().all(|s| s.residuals.is_none()));
    assert_eq!(state.structural_history_len(), 4);
    assert_eq!(state.aero_history_len(), 4);
}

#[test]
fn exhausted_budget_commits_last_iterate_and_continues() {
    let calls = Rc::new(Recorder::default());
    // Loads keep changing by more than the tolerance.
    let reg = registry(&calls, 0.9, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        n_time_steps: 2,
        fsi_substeps: 3,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();

    assert_eq!(summary.non_converged(), 2);
    assert!(summary.steps.iter().all(|s| s.substeps == 3));
    // Three real substeps per outer step; the fourth index only warns.
    assert_eq!(calls.aero_runs.get(), 6);
    assert_eq!(calls.structural_runs.get(), 6);
    assert_eq!(state.structural_history_len(), 3);
}

#[test]
fn divergence_aborts_whole_run() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, Some(2));
    let mut state = seed_state();
    let cfg = CouplingSettings {
        n_time_steps: 5,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let err = orch.run(&mut state).unwrap_err();

    assert!(matches!(err, CouplingError::Divergence { ts: 2, substep: 0 }));
    // Step 1 committed, step 2 never committed.
    assert_eq!(state.structural_history_len(), 2);
    assert_eq!(state.aero_history_len(), 2);
    assert_eq!(calls.postprocessor_calls.borrow().len(), 0);
}

#[test]
fn cleanup_trims_previous_phase_and_numbering_restarts_at_one() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    for i in 0..3 {
        state.structure.add_step().unwrap();
        state.aero.add_step().unwrap();
        state.structure.last_mut().unwrap().for_vel[1] = i as f64;
    }
    state.ts = 3;

    let mut orch = CouplingOrchestrator::initialise(settings(), &reg, &mut state).unwrap();
    assert_eq!(state.structural_history_len(), 1);
    assert_eq!(state.ts, 0);
    assert_eq!(state.structure.timestep_info[0].for_vel[1], 2.0);

    let summary = orch.run(&mut state).unwrap();
    assert_eq!(summary.steps[0].ts, 1);
}

#[test]
fn without_cleanup_numbering_continues_from_history() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    for _ in 0..3 {
        state.structure.add_step().unwrap();
        state.aero.add_step().unwrap();
    }
    let cfg = CouplingSettings {
        cleanup_previous_solution: false,
        n_time_steps: 2,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();

    let numbers: Vec<usize> = summary.steps.iter().map(|s| s.ts).collect();
    assert_eq!(numbers, vec![4, 5]);
    assert_eq!(state.structural_history_len(), 6);
}

#[test]
fn misaligned_histories_are_rejected() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    state.structure.add_step().unwrap();
    let cfg = CouplingSettings {
        cleanup_previous_solution: false,
        ..settings()
    };
    let err = CouplingOrchestrator::initialise(cfg, &reg, &mut state).err().unwrap();
    assert!(matches!(err, CouplingError::History { .. }));
}

#[test]
fn unsteady_flag_stays_off_during_startup_steps() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        n_time_steps: 6,
        fsi_substeps: 10,
        include_unsteady_force_contribution: true,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();

    let flags = calls.unsteady_flags.borrow();
    for (ts, flag) in flags.iter() {
        if *ts < 5 {
            assert!(!flag, "unsteady forces must stay off at ts={ts}");
        }
    }
    // At ts 5 and 6 the ramp starts at zero and is switched on from k = 1.
    let late: Vec<bool> = flags
        .iter()
        .filter(|(ts, _)| *ts == 6)
        .map(|(_, f)| *f)
        .collect();
    assert!(!late[0]);
    assert!(late[1..].iter().all(|f| *f));
    // Convergence is held back until the ramp has fully engaged.
    assert!(summary.steps.iter().all(|s| s.substeps >= 5));
}

#[test]
fn postprocessors_run_in_order_after_commit() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        n_time_steps: 2,
        postprocessors: vec!["Second".to_string(), "First".to_string()],
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    orch.run(&mut state).unwrap();

    let calls = calls.postprocessor_calls.borrow();
    let expected = vec![
        ("Second".to_string(), 2),
        ("First".to_string(), 2),
        ("Second".to_string(), 3),
        ("First".to_string(), 3),
    ];
    assert_eq!(*calls, expected);
}

#[test]
fn progress_records_follow_each_commit() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        n_time_steps: 3,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let mut records: Vec<ProgressRecord> = Vec::new();
    let mut cb = |r: &ProgressRecord| records.push(r.clone());
    orch.run_with_progress(&mut state, Some(&mut cb)).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[2].ts, 3);
    assert_eq!(records[0].for_vel_x, 10.0);
    assert!((records[0].force_z - 8.0).abs() < 1e-12);
    assert!(records[0].log10_res_dqdt.is_infinite());
}

#[test]
fn unknown_solver_fails_initialise() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        aero_solver: "Missing".to_string(),
        ..settings()
    };
    let err = CouplingOrchestrator::initialise(cfg, &reg, &mut state).err().unwrap();
    assert!(matches!(err, CouplingError::UnknownSolver { kind: "aero", .. }));
}

#[test]
fn density_and_gravity_accessors_reach_collaborators() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    let mut orch = CouplingOrchestrator::initialise(settings(), &reg, &mut state).unwrap();

    assert_eq!(orch.air_density(), Some(1.225));
    orch.set_air_density(0.9).unwrap();
    assert_eq!(orch.air_density(), Some(0.9));

    assert_eq!(orch.gravity(), None);
    assert!(orch.set_gravity(9.81).is_err());
}

#[test]
fn static_relaxation_blends_with_previous_substep() {
    let calls = Rc::new(Recorder::default());
    // Lift per vertex 3.0, then 2.5: nodes see 6.0, then 5.0.
    let reg = registry(&calls, 0.5, None);
    let mut state = seed_state();
    state.structure.timestep_info[0].steady_applied_forces[(0, 2)] = 2.0;
    let cfg = CouplingSettings {
        fsi_substeps: 2,
        relaxation_factor: 0.5,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();
    assert!(!summary.steps[0].converged);

    // k = 0 blends against the committed entry, k = 1 against substep 0.
    assert_eq!(*calls.node0_loads.borrow(), vec![4.0, 4.5]);
    let committed = state.last_structural().unwrap();
    assert!((committed.steady_applied_forces[(0, 2)] - 4.5).abs() < 1e-12);
    assert!((committed.steady_applied_forces[(1, 2)] - 4.0).abs() < 1e-12);
    assert!(committed.unsteady_applied_forces.iter().all(|f| *f == 0.0));
}

#[test]
fn dynamic_relaxation_factor_follows_substep() {
    let calls = Rc::new(Recorder::default());
    // Nodes see 6.0, 5.0 and 4.5 over three substeps.
    let reg = registry(&calls, 0.5, None);
    let mut state = seed_state();
    let cfg = CouplingSettings {
        fsi_substeps: 3,
        dynamic_relaxation: true,
        relaxation_factor: 0.6,
        final_relaxation_factor: 0.0,
        relaxation_steps: 3,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    orch.run(&mut state).unwrap();

    // Factors 0.6, 0.4 and 0.2 for k = 0, 1, 2.
    let expected = [0.4 * 6.0, 0.6 * 5.0 + 0.4 * 2.4, 0.8 * 4.5 + 0.2 * 3.96];
    let loads = calls.node0_loads.borrow();
    assert_eq!(loads.len(), 3);
    for (got, want) in loads.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "{got} != {want}");
    }
    let committed = state.last_structural().unwrap();
    assert!((committed.steady_applied_forces[(1, 2)] - expected[2]).abs() < 1e-12);
}

#[test]
fn initial_steady_and_prescribed_dynamic_forces_are_added() {
    let calls = Rc::new(Recorder::default());
    let reg = registry(&calls, 0.0, None);
    let mut state = seed_state();
    state.structure.ini_info.steady_applied_forces[(1, 2)] = 1.5;
    state.structure.dynamic_forces = (0..4)
        .map(|i| {
            let mut f = DMatrix::zeros(NUM_NODE, 6);
            f[(0, 1)] = 100.0 + i as f64;
            f
        })
        .collect();
    let cfg = CouplingSettings {
        n_time_steps: 3,
        ..settings()
    };

    let mut orch = CouplingOrchestrator::initialise(cfg, &reg, &mut state).unwrap();
    let summary = orch.run(&mut state).unwrap();
    assert!(summary.steps.iter().all(|s| s.converged));

    for ts in 1..=3 {
        let entry = &state.structure.timestep_info[ts];
        // 2 vertices x 2.0 N mapped per node, plus the initial load.
        assert!((entry.steady_applied_forces[(0, 2)] - 4.0).abs() < 1e-12);
        assert!((entry.steady_applied_forces[(1, 2)] - 5.5).abs() < 1e-12);
        // Step ts reads the prescribed table at ts - 1.
        assert_eq!(entry.unsteady_applied_forces[(0, 1)], 100.0 + (ts - 1) as f64);
        assert_eq!(entry.unsteady_applied_forces[(1, 1)], 0.0);
        // Aero dynamic loads are scaled to zero without the unsteady contribution.
        assert!(entry.unsteady_applied_forces.column(2).iter().all(|f| *f == 0.0));
    }
}

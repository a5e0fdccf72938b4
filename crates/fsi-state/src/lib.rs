//! Simulation state shared between the coupling driver and its solvers.
//!
//! Provides:
//! - Per-timestep structural and aerodynamic snapshots
//! - Index-aligned history buffers with a time cursor
//! - Prescribed (non-aerodynamic) force inputs

pub mod aero;
pub mod error;
pub mod simulation;
pub mod structural;

pub use aero::AeroTimestepState;
pub use error::{StateError, StateResult};
pub use simulation::{AeroData, SimulationState, StructuralData};
pub use structural::{FORCE_COLUMNS, StructuralTimestepState};

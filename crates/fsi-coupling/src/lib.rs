//! Fluid-structure coupling driver.
//!
//! Provides:
//! - Outer time marching with inner Gauss-Seidel substeps
//! - Static and dynamic under-relaxation of the mapped loads
//! - Normalized-residual convergence test with divergence detection
//! - History trimming and commit discipline for the shared state
//! - Identifier-based registry of aero, structural and postprocessing solvers

pub mod collaborators;
pub mod convergence;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod relaxation;
pub mod settings;

// Re-exports for public API
pub use collaborators::{AeroSolver, ForceMapper, Postprocessor, SolverContext, StructuralSolver};
pub use convergence::{ConvergenceBaseline, ConvergenceCriteria, ConvergenceMonitor, Residuals};
pub use error::{CouplingError, CouplingResult};
pub use history::TimestepHistoryManager;
pub use orchestrator::{CouplingOrchestrator, CouplingSummary, StepReport};
pub use progress::{ProgressRecord, ResidualTable};
pub use registry::{RegistryListing, SolverRegistry};
pub use relaxation::{
    ForceRelaxer, RelaxationScheduler, UNSTEADY_RAMP, late_substep_override,
    unsteady_force_coefficient,
};
pub use settings::CouplingSettings;

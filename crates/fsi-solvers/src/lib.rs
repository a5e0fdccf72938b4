//! Reference collaborators for the coupling driver.
//!
//! These keep the physics minimal: a lumped mass-spring-damper structure,
//! a quasi-steady strip aerodynamic model and a vertex-to-node load mapper.
//! They exist so the driver can run end to end.

pub mod aero;
pub mod error;
pub mod mapping;
pub mod postproc;
pub mod structural;

pub use aero::{QuasiSteadyAero, QuasiSteadyAeroSettings};
pub use error::{SolverError, SolverResult};
pub use mapping::VertexForceMapper;
pub use postproc::{StateSummary, TimeSeriesCsv, TimeSeriesCsvSettings};
pub use structural::{LumpedStructure, LumpedStructureSettings};

use fsi_coupling::SolverRegistry;

/// Registry holding every collaborator of this crate under its identifier.
pub fn builtin_registry() -> SolverRegistry {
    let mut registry = SolverRegistry::new();
    registry
        .register_structural(LumpedStructure::ID, |settings| {
            Ok(Box::new(LumpedStructure::from_value(settings)?))
        })
        .register_aero(QuasiSteadyAero::ID, |settings| {
            Ok(Box::new(QuasiSteadyAero::from_value(settings)?))
        })
        .register_postprocessor(StateSummary::ID, |_| Ok(Box::new(StateSummary::default())))
        .register_postprocessor(TimeSeriesCsv::ID, |settings| {
            Ok(Box::new(TimeSeriesCsv::from_value(settings)?))
        })
        .set_force_mapper(|| Box::new(VertexForceMapper));
    registry
}

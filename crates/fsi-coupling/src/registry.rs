//! Identifier-based lookup of collaborator implementations.

use crate::collaborators::{AeroSolver, ForceMapper, Postprocessor, StructuralSolver};
use crate::error::{CouplingError, CouplingResult};
use std::collections::BTreeMap;

pub type StructuralFactory =
    Box<dyn Fn(&serde_json::Value) -> CouplingResult<Box<dyn StructuralSolver>>>;
pub type AeroFactory = Box<dyn Fn(&serde_json::Value) -> CouplingResult<Box<dyn AeroSolver>>>;
pub type PostprocessorFactory =
    Box<dyn Fn(&serde_json::Value) -> CouplingResult<Box<dyn Postprocessor>>>;
pub type ForceMapperFactory = Box<dyn Fn() -> Box<dyn ForceMapper>>;

/// Factories keyed by solver identifier.
///
/// Factories receive the identifier's nested settings block. Lookups happen
/// once, while the driver is initialised.
#[derive(Default)]
pub struct SolverRegistry {
    structural: BTreeMap<String, StructuralFactory>,
    aero: BTreeMap<String, AeroFactory>,
    postprocessors: BTreeMap<String, PostprocessorFactory>,
    force_mapper: Option<ForceMapperFactory>,
}

impl SolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_structural<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> CouplingResult<Box<dyn StructuralSolver>> + 'static,
    {
        self.structural.insert(id.into(), Box::new(factory));
        self
    }

    pub fn register_aero<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> CouplingResult<Box<dyn AeroSolver>> + 'static,
    {
        self.aero.insert(id.into(), Box::new(factory));
        self
    }

    pub fn register_postprocessor<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> CouplingResult<Box<dyn Postprocessor>> + 'static,
    {
        self.postprocessors.insert(id.into(), Box::new(factory));
        self
    }

    pub fn set_force_mapper<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn ForceMapper> + 'static,
    {
        self.force_mapper = Some(Box::new(factory));
        self
    }

    pub fn structural(
        &self,
        id: &str,
        settings: &serde_json::Value,
    ) -> CouplingResult<Box<dyn StructuralSolver>> {
        let factory = self.structural.get(id).ok_or_else(|| unknown("structural", id))?;
        factory(settings)
    }

    pub fn aero(&self, id: &str, settings: &serde_json::Value) -> CouplingResult<Box<dyn AeroSolver>> {
        let factory = self.aero.get(id).ok_or_else(|| unknown("aero", id))?;
        factory(settings)
    }

    pub fn postprocessor(
        &self,
        id: &str,
        settings: &serde_json::Value,
    ) -> CouplingResult<Box<dyn Postprocessor>> {
        let factory = self
            .postprocessors
            .get(id)
            .ok_or_else(|| unknown("postprocessor", id))?;
        factory(settings)
    }

    pub fn force_mapper(&self) -> CouplingResult<Box<dyn ForceMapper>> {
        let factory = self
            .force_mapper
            .as_ref()
            .ok_or_else(|| unknown("force mapper", "<unset>"))?;
        Ok(factory())
    }

    /// Registered identifiers, per collaborator kind.
    pub fn identifiers(&self) -> RegistryListing {
        RegistryListing {
            structural: self.structural.keys().cloned().collect(),
            aero: self.aero.keys().cloned().collect(),
            postprocessors: self.postprocessors.keys().cloned().collect(),
        }
    }
}

/// Snapshot of the identifiers known to a registry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistryListing {
    pub structural: Vec<String>,
    pub aero: Vec<String>,
    pub postprocessors: Vec<String>,
}

fn unknown(kind: &'static str, id: &str) -> CouplingError {
    CouplingError::UnknownSolver {
        kind,
        id: id.to_string(),
    }
}

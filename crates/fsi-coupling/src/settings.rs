//! Typed configuration for the coupling driver.

use crate::error::{CouplingError, CouplingResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings of one coupled time-marching run.
///
/// Solver selection is by identifier; the nested settings blocks are handed
/// untouched to the matching collaborator factory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CouplingSettings {
    /// Log a residual table line after each committed step
    pub print_info: bool,
    pub structural_solver: String,
    pub structural_solver_settings: serde_json::Value,
    pub aero_solver: String,
    pub aero_solver_settings: serde_json::Value,
    /// Number of outer steps to march
    pub n_time_steps: usize,
    /// Time increment between outer steps (seconds)
    pub dt: f64,
    /// Structural load steps per outer step, forwarded to the structural solver
    pub structural_substeps: usize,
    /// Budget of fixed-point substeps per outer step
    pub fsi_substeps: usize,
    pub fsi_tolerance: f64,
    pub relaxation_factor: f64,
    pub final_relaxation_factor: f64,
    pub minimum_steps: usize,
    pub relaxation_steps: usize,
    pub dynamic_relaxation: bool,
    /// Postprocessors, run in this order after every commit
    pub postprocessors: Vec<String>,
    pub postprocessors_settings: BTreeMap<String, serde_json::Value>,
    pub cleanup_previous_solution: bool,
    pub include_unsteady_force_contribution: bool,
}

impl Default for CouplingSettings {
    fn default() -> Self {
        Self {
            print_info: true,
            structural_solver: String::new(),
            structural_solver_settings: serde_json::Value::Null,
            aero_solver: String::new(),
            aero_solver_settings: serde_json::Value::Null,
            n_time_steps: 100,
            dt: 0.05,
            structural_substeps: 1,
            fsi_substeps: 70,
            fsi_tolerance: 1e-5,
            relaxation_factor: 0.2,
            final_relaxation_factor: 0.0,
            minimum_steps: 3,
            relaxation_steps: 100,
            dynamic_relaxation: true,
            postprocessors: Vec::new(),
            postprocessors_settings: BTreeMap::new(),
            cleanup_previous_solution: true,
            include_unsteady_force_contribution: false,
        }
    }
}

impl CouplingSettings {
    /// Reject settings the driver cannot run with.
    pub fn validate(&self) -> CouplingResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(invalid(format!("dt must be positive, got {}", self.dt)));
        }
        if !self.fsi_tolerance.is_finite() || self.fsi_tolerance <= 0.0 {
            return Err(invalid(format!(
                "fsi_tolerance must be positive, got {}",
                self.fsi_tolerance
            )));
        }
        for (name, value) in [
            ("relaxation_factor", self.relaxation_factor),
            ("final_relaxation_factor", self.final_relaxation_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        if self.structural_substeps == 0 {
            return Err(invalid("structural_substeps must be at least 1".to_string()));
        }
        if self.structural_solver.is_empty() {
            return Err(invalid("structural_solver is not set".to_string()));
        }
        if self.aero_solver.is_empty() {
            return Err(invalid("aero_solver is not set".to_string()));
        }
        if let Some(empty) = self.postprocessors.iter().find(|id| id.is_empty()) {
            return Err(invalid(format!("empty postprocessor identifier {empty:?}")));
        }
        Ok(())
    }

    /// Settings block for postprocessor `id`, `null` when none was given.
    pub fn postprocessor_settings(&self, id: &str) -> serde_json::Value {
        self.postprocessors_settings
            .get(id)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

fn invalid(what: String) -> CouplingError {
    CouplingError::InvalidSettings { what }
}

//! Case schema definitions.

use fsi_coupling::CouplingSettings;
use serde::{Deserialize, Serialize};

/// A complete coupled case: geometry, prescribed loads and driver settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDef {
    pub version: u32,
    pub name: String,
    pub model: ModelDef,
    #[serde(default)]
    pub coupling: CouplingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    /// Initial nodal positions in the body frame
    pub nodes: Vec<[f64; 3]>,
    /// Undeformed nodal positions; the initial displacement is `nodes - reference_nodes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_nodes: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub vertices: Vec<VertexDef>,
    /// Frame-of-reference velocity, linear then angular
    #[serde(default)]
    pub for_vel: [f64; 6],
    /// Steady nodal loads, one row per node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steady_forces: Option<Vec<[f64; 6]>>,
    /// Prescribed unsteady nodal loads, one table per step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_forces: Option<Vec<Vec<[f64; 6]>>>,
}

/// Aerodynamic grid vertex attached to a structural node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VertexDef {
    pub position: [f64; 3],
    pub node: usize,
}

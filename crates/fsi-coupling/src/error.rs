//! Error types for the coupling driver.

use thiserror::Error;

/// Errors encountered while driving the coupled simulation.
///
/// Only `Divergence` is raised by the iteration itself; exhausting the
/// substep budget is logged and never surfaces here.
#[derive(Error, Debug)]
pub enum CouplingError {
    #[error("Not converged: non-finite structural state at step {ts}, substep {substep}")]
    Divergence { ts: usize, substep: usize },

    #[error("Invalid settings: {what}")]
    InvalidSettings { what: String },

    #[error("Unknown {kind} solver: {id}")]
    UnknownSolver { kind: &'static str, id: String },

    #[error("Collaborator {name} failed: {message}")]
    Collaborator { name: String, message: String },

    #[error("History error: {what}")]
    History { what: String },

    #[error("Shape mismatch: {what}")]
    Shape { what: String },

    #[error("State error: {0}")]
    State(#[from] fsi_state::StateError),
}

pub type CouplingResult<T> = Result<T, CouplingError>;

impl From<fsi_core::CoreError> for CouplingError {
    fn from(e: fsi_core::CoreError) -> Self {
        CouplingError::Shape {
            what: e.to_string(),
        }
    }
}

impl CouplingError {
    /// Wrap a collaborator failure with the collaborator's identifier.
    pub fn collaborator(name: impl Into<String>, message: impl ToString) -> Self {
        CouplingError::Collaborator {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

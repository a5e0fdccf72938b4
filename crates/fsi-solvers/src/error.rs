//! Error types for the reference collaborators.

use fsi_coupling::CouplingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid settings for {solver}: {message}")]
    Settings {
        solver: &'static str,
        message: String,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for CouplingError {
    fn from(e: SolverError) -> Self {
        let name = match &e {
            SolverError::Settings { solver, .. } => solver.to_string(),
            SolverError::InvalidArg { .. } | SolverError::Io(_) => "fsi-solvers".to_string(),
        };
        CouplingError::Collaborator {
            name,
            message: e.to_string(),
        }
    }
}

/// Deserialize a settings block, treating `null` as all defaults.
pub(crate) fn parse_settings<T>(solver: &'static str, value: &serde_json::Value) -> SolverResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| SolverError::Settings {
        solver,
        message: e.to_string(),
    })
}

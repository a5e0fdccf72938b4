//! Error types for simulation state access.

use thiserror::Error;

/// Errors raised when reading or writing the history buffers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("History is empty: {what}")]
    EmptyHistory { what: &'static str },

    #[error("History index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type StateResult<T> = Result<T, StateError>;

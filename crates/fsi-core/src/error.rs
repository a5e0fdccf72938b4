use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what} at index {index}: {value}")]
    NonFinite {
        what: &'static str,
        index: usize,
        value: f64,
    },

    #[error("Length mismatch for {what}: {left} != {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },
}

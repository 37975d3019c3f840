use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid date `{input}`")]
    InvalidDate { input: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("event magnitude must be a finite non-negative number, got {value}")]
    InvalidMagnitude { value: f64 },
}

pub type EngineResult<T> = Result<T, EngineError>;

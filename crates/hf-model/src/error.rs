//! Error types for model construction.

use thiserror::Error;

/// Errors raised while building or finalizing a model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Duplicate block name: {name}")]
    DuplicateBlock { name: String },

    #[error("No block named {name}")]
    UnknownBlock { name: String },

    #[error("Time-dependent parameter needs times matching its values (got {times} times, {values} values)")]
    CurveShape { times: usize, values: usize },

    #[error("Time points of a parameter curve must be strictly ascending")]
    NonMonotonicTimes,

    #[error(
        "Inconsistent cardiac cycle period: model uses {expected}, parameter defines {found}"
    )]
    InconsistentCyclePeriod { expected: f64, found: f64 },

    #[error("System is not square after finalize: {variables} variables, {equations} equations")]
    NotSquare { variables: usize, equations: usize },

    #[error("Block {name} must connect {expected}, found {found}")]
    BadConnectivity {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Model already finalized: {what}")]
    Finalized { what: &'static str },
}

pub type ModelResult<T> = Result<T, ModelError>;

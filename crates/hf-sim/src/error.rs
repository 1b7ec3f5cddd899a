//! Error types for simulation runs.

use thiserror::Error;

/// Errors encountered while driving a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Steady initial condition is not compatible with a closed-loop heart block")]
    SteadyWithHeart,

    #[error("Invalid simulation setup: {what}")]
    InvalidSetup { what: &'static str },

    #[error(transparent)]
    Algebra(#[from] hf_algebra::AlgebraError),
}

pub type SimResult<T> = Result<T, SimError>;

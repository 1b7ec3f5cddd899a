//! Error types for the algebraic core.

use thiserror::Error;

/// Errors raised while assembling or solving the DAE system.
#[derive(Error, Debug)]
pub enum AlgebraError {
    #[error(
        "Newton iterations did not converge at t={time:.6e} \
         after {iterations} iterations (max|r|={residual:.3e})"
    )]
    Convergence {
        time: f64,
        iterations: usize,
        residual: f64,
    },

    #[error("Jacobian factorization failed at t={time:.6e}: {what}")]
    SingularJacobian { time: f64, what: &'static str },

    #[error("Sparse system error: {what}")]
    System { what: &'static str },
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

/// Failure of a single linear solve, before the integrator attaches the
/// simulation time to it.
#[derive(Error, Debug)]
pub enum LinearSolveError {
    #[error("LU factorization failed")]
    Factorization,

    #[error("solution contains non-finite entries")]
    NonFinite,
}

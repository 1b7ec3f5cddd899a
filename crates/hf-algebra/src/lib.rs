//! hf-algebra: the numerical core of hemoflow.
//!
//! The blood flow network is a nonlinear differential-algebraic system
//!
//! ```text
//! E(y, t) · ẏ + F(y, t) · y + c(y, t) = 0
//! ```
//!
//! assembled from per-block contributions into a [`SparseSystem`] and
//! advanced in time by the generalized-alpha [`Integrator`].

pub mod error;
pub mod integrator;
pub mod sparse;
pub mod state;

pub use error::{AlgebraError, AlgebraResult};
pub use integrator::{DaeModel, Integrator};
pub use sparse::{MatrixKind, SparseSystem, TripletCounts};
pub use state::State;

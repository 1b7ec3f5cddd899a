//! hf-sim: drives a finalized model through time.
//!
//! Owns the simulation parameter set (with the time step and step count
//! derivations), the steady-state initializer, and the outer loop that
//! samples states for output.

pub mod error;
pub mod params;
pub mod sim;

pub use error::{SimError, SimResult};
pub use params::SimulationParameters;
pub use sim::{run_simulation, steady_initial_state, SimulationOutput};

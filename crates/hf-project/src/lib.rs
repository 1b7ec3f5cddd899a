//! hf-project: configuration schema and model loading.
//!
//! Reads the JSON simulation configuration, builds the block network, and
//! hands back a finalized [`hf_model::Model`] together with resolved
//! simulation parameters and the initial state.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ProjectError, ProjectResult};
pub use loader::{load_file, load_str, LoadedSimulation};

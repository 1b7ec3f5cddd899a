//! hf-results: writes simulation results.
//!
//! Two table flavors: vessel-centric (inlet/outlet pressure and flow per
//! vessel) and variable-centric (one column per DOF). Both serialize to
//! CSV or JSON, optionally collapsed to means or extended with time
//! derivatives.

pub mod error;
pub mod table;
pub mod writer;

pub use error::{ResultsError, ResultsResult};
pub use table::{variable_table, vessel_table, OutputOptions, Table};
pub use writer::{format_for_path, to_csv, to_json, OutputFormat};

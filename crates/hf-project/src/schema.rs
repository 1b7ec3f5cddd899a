//! Configuration schema definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProjectError, ProjectResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub simulation_parameters: SimulationParametersDef,
    #[serde(default)]
    pub vessels: Vec<VesselDef>,
    #[serde(default)]
    pub junctions: Vec<JunctionDef>,
    #[serde(default)]
    pub boundary_conditions: Vec<BoundaryConditionDef>,
    #[serde(default)]
    pub valves: Vec<ValveDef>,
    #[serde(default)]
    pub chambers: Vec<ChamberDef>,
    #[serde(default)]
    pub closed_loop_blocks: Vec<ClosedLoopDef>,
    #[serde(default)]
    pub external_solver_coupling_blocks: Vec<serde_json::Value>,
    #[serde(default)]
    pub initial_condition: HashMap<String, f64>,
    #[serde(default)]
    pub initial_condition_d: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParametersDef {
    #[serde(default)]
    pub number_of_cardiac_cycles: Option<usize>,
    #[serde(default)]
    pub number_of_time_pts_per_cardiac_cycle: Option<usize>,
    #[serde(default)]
    pub coupled_simulation: bool,
    #[serde(default)]
    pub number_of_time_pts: Option<usize>,
    #[serde(default = "default_external_step_size")]
    pub external_step_size: f64,
    #[serde(default = "default_absolute_tolerance")]
    pub absolute_tolerance: f64,
    #[serde(default = "default_max_nonlinear_iterations")]
    pub maximum_nonlinear_iterations: usize,
    /// Left unset it defaults to true, but is silently disabled by a
    /// closed-loop heart block; set explicitly to true it becomes an error
    /// in that combination.
    #[serde(default)]
    pub steady_initial: Option<bool>,
    #[serde(default = "default_output_interval")]
    pub output_interval: usize,
    #[serde(default)]
    pub output_mean_only: bool,
    #[serde(default)]
    pub output_variable_based: bool,
    #[serde(default)]
    pub output_derivative: bool,
    #[serde(default)]
    pub output_all_cycles: bool,
}

fn default_external_step_size() -> f64 {
    0.1
}

fn default_absolute_tolerance() -> f64 {
    1e-8
}

fn default_max_nonlinear_iterations() -> usize {
    30
}

fn default_output_interval() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselDef {
    pub vessel_id: i64,
    pub vessel_name: String,
    pub zero_d_element_type: String,
    pub zero_d_element_values: VesselValues,
    #[serde(default)]
    pub boundary_conditions: Option<VesselBcDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselValues {
    #[serde(rename = "R_poiseuille")]
    pub r_poiseuille: f64,
    #[serde(rename = "C", default)]
    pub c: f64,
    #[serde(rename = "L", default)]
    pub l: f64,
    #[serde(default)]
    pub stenosis_coefficient: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselBcDef {
    #[serde(default)]
    pub inlet: Option<String>,
    #[serde(default)]
    pub outlet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionDef {
    pub junction_name: String,
    pub junction_type: String,
    #[serde(default)]
    pub inlet_vessels: Vec<i64>,
    #[serde(default)]
    pub outlet_vessels: Vec<i64>,
    #[serde(default)]
    pub junction_values: Option<JunctionValues>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionValues {
    #[serde(rename = "R", default)]
    pub r: Vec<f64>,
    #[serde(rename = "R_poiseuille", default)]
    pub r_poiseuille: Vec<f64>,
    #[serde(rename = "C", default)]
    pub c: Vec<f64>,
    #[serde(rename = "L", default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub stenosis_coefficient: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConditionDef {
    pub bc_name: String,
    pub bc_type: String,
    pub bc_values: BcValues,
}

/// Boundary condition values: an optional time axis plus named entries
/// that may each be a scalar or an array matching the time axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcValues {
    #[serde(default)]
    pub t: Option<Vec<f64>>,
    /// Curves wrap periodically unless disabled
    #[serde(default = "default_true")]
    pub periodic: bool,
    #[serde(flatten)]
    pub entries: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl BcValues {
    /// A required scalar entry.
    pub fn scalar(&self, key: &str, context: &str) -> ProjectResult<f64> {
        match self.entries.get(key) {
            Some(value) => value.as_f64().ok_or_else(|| ProjectError::Invalid {
                what: format!("{context}: {key} must be a number"),
            }),
            None => Err(ProjectError::MissingKey {
                key: key.to_string(),
                context: context.to_string(),
            }),
        }
    }

    /// A required entry that is either a scalar or an array of samples.
    pub fn samples(&self, key: &str, context: &str) -> ProjectResult<Vec<f64>> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ProjectError::MissingKey {
                key: key.to_string(),
                context: context.to_string(),
            })?;
        if let Some(scalar) = value.as_f64() {
            return Ok(vec![scalar]);
        }
        let samples: Option<Vec<f64>> = value
            .as_array()
            .map(|array| array.iter().map(|v| v.as_f64()).collect())
            .unwrap_or(None);
        samples.ok_or_else(|| ProjectError::Invalid {
            what: format!("{context}: {key} must be a number or an array of numbers"),
        })
    }

    /// An optional boolean flag, false when absent.
    pub fn flag(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValveDef {
    pub name: String,
    #[serde(rename = "type")]
    pub valve_type: String,
    pub params: BcValues,
    pub upstream_block: String,
    pub downstream_block: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChamberDef {
    pub name: String,
    #[serde(rename = "type")]
    pub chamber_type: String,
    pub values: BcValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedLoopDef {
    pub closed_loop_type: String,
    #[serde(default)]
    pub cardiac_cycle_period: Option<f64>,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
    #[serde(default)]
    pub outlet_blocks: Vec<String>,
}

/// Parse a configuration from JSON text.
pub fn parse(json: &str) -> ProjectResult<Config> {
    Ok(serde_json::from_str(json)?)
}

//! Builds a finalized model from a parsed configuration.

use std::collections::HashMap;
use std::path::Path;

use hf_algebra::State;
use hf_core::ParamId;
use hf_model::blocks::{
    heart_pulmonary, BloodVessel, BloodVesselJunction, BranchParams, ChamberElastanceInductor,
    ClosedLoopHeartPulmonary, ClosedLoopRcrBc, FlowReferenceBc, Junction, OpenLoopCoronaryBc,
    PressureReferenceBc, ResistanceBc, ResistiveJunction, ValveTanh, WindkesselBc,
};
use hf_model::Model;
use hf_sim::SimulationParameters;

use crate::error::{ProjectError, ProjectResult};
use crate::schema::{self, BcValues, Config};

/// Name given to the singleton heart block.
const HEART_BLOCK_NAME: &str = "CLH";

/// Heart parameter keys, in the order the block expects them.
const HEART_PARAM_KEYS: [&str; 27] = [
    "Tsa", "tpwave", "Erv_s", "Elv_s", "iml", "imr", "Lra_v", "Rra_v", "Lrv_a", "Rrv_a", "Lla_v",
    "Rla_v", "Llv_a", "Rlv_ao", "Vrv_u", "Vlv_u", "Rpd", "Cp", "Cpa", "Kxp_ra", "Kxv_ra",
    "Kxp_la", "Kxv_la", "Emax_ra", "Emax_la", "Vaso_ra", "Vaso_la",
];

/// Everything needed to run a simulation.
#[derive(Debug)]
pub struct LoadedSimulation {
    pub model: Model,
    pub params: SimulationParameters,
    pub initial_state: State,
}

/// Load a configuration file.
pub fn load_file(path: impl AsRef<Path>) -> ProjectResult<LoadedSimulation> {
    let text = std::fs::read_to_string(path)?;
    load_str(&text)
}

/// Load a configuration from JSON text.
pub fn load_str(json: &str) -> ProjectResult<LoadedSimulation> {
    build(&schema::parse(json)?)
}

/// Register a scalar-or-curve entry as a model parameter.
fn add_bc_parameter(
    model: &mut Model,
    values: &BcValues,
    key: &str,
    context: &str,
) -> ProjectResult<ParamId> {
    let samples = values.samples(key, context)?;
    if samples.len() == 1 {
        return Ok(model.add_parameter(samples[0]));
    }
    let times = values.t.clone().ok_or_else(|| ProjectError::Invalid {
        what: format!("{context}: {key} is a curve but no time axis t was given"),
    })?;
    Ok(model.add_parameter_curve(times, samples, values.periodic)?)
}

fn simulation_parameters(config: &Config) -> ProjectResult<SimulationParameters> {
    let sim = &config.simulation_parameters;
    let missing = |key: &str| ProjectError::MissingKey {
        key: key.to_string(),
        context: "simulation_parameters".to_string(),
    };

    let mut params = if sim.coupled_simulation {
        let steps = sim
            .number_of_time_pts
            .ok_or_else(|| missing("number_of_time_pts"))?;
        SimulationParameters::coupled(steps, sim.external_step_size)
    } else {
        let cycles = sim
            .number_of_cardiac_cycles
            .ok_or_else(|| missing("number_of_cardiac_cycles"))?;
        let pts = sim
            .number_of_time_pts_per_cardiac_cycle
            .ok_or_else(|| missing("number_of_time_pts_per_cardiac_cycle"))?;
        SimulationParameters::uncoupled(cycles, pts)
    };

    params.abs_tol = sim.absolute_tolerance;
    params.max_nonlinear_iterations = sim.maximum_nonlinear_iterations;
    params.output_interval = sim.output_interval;
    params.output_mean_only = sim.output_mean_only;
    params.output_variable_based = sim.output_variable_based;
    params.output_derivative = sim.output_derivative;
    params.output_all_cycles = sim.output_all_cycles;
    Ok(params)
}

fn build(config: &Config) -> ProjectResult<LoadedSimulation> {
    if !config.external_solver_coupling_blocks.is_empty() {
        return Err(ProjectError::ExternalCoupling);
    }

    let mut params = simulation_parameters(config)?;
    let mut model = Model::new();
    // Block name pairs to join with a node, in creation order
    let mut connections: Vec<(String, String)> = Vec::new();

    // Vessels
    let mut vessel_names: HashMap<i64, String> = HashMap::new();
    for vessel in &config.vessels {
        if vessel.zero_d_element_type != "BloodVessel" {
            return Err(ProjectError::UnknownType {
                kind: "vessel element",
                name: vessel.zero_d_element_type.clone(),
            });
        }
        let name = &vessel.vessel_name;
        let values = &vessel.zero_d_element_values;
        let r = model.add_parameter(values.r_poiseuille);
        let c = (values.c != 0.0).then(|| model.add_parameter(values.c));
        let l = (values.l != 0.0).then(|| model.add_parameter(values.l));
        let k = (values.stenosis_coefficient != 0.0)
            .then(|| model.add_parameter(values.stenosis_coefficient));
        model.add_block(Box::new(BloodVessel::new(name.clone(), r, c, l, k)))?;
        vessel_names.insert(vessel.vessel_id, name.clone());

        if let Some(bc) = &vessel.boundary_conditions {
            if let Some(inlet) = &bc.inlet {
                connections.push((inlet.clone(), name.clone()));
            }
            if let Some(outlet) = &bc.outlet {
                connections.push((name.clone(), outlet.clone()));
            }
        }
    }

    // Boundary conditions
    let mut closed_loop_bcs: Vec<String> = Vec::new();
    for bc in &config.boundary_conditions {
        let name = bc.bc_name.clone();
        let values = &bc.bc_values;
        match bc.bc_type.as_str() {
            "FLOW" => {
                let q = add_bc_parameter(&mut model, values, "Q", &name)?;
                model.add_block(Box::new(FlowReferenceBc::new(name, q)))?;
            }
            "PRESSURE" => {
                let p = add_bc_parameter(&mut model, values, "P", &name)?;
                model.add_block(Box::new(PressureReferenceBc::new(name, p)))?;
            }
            "RESISTANCE" => {
                let r = add_bc_parameter(&mut model, values, "R", &name)?;
                let pd = add_bc_parameter(&mut model, values, "Pd", &name)?;
                model.add_block(Box::new(ResistanceBc::new(name, r, pd)))?;
            }
            "RCR" => {
                let rp = add_bc_parameter(&mut model, values, "Rp", &name)?;
                let c = add_bc_parameter(&mut model, values, "C", &name)?;
                let rd = add_bc_parameter(&mut model, values, "Rd", &name)?;
                let pd = add_bc_parameter(&mut model, values, "Pd", &name)?;
                model.add_block(Box::new(WindkesselBc::new(name, rp, c, rd, pd)))?;
            }
            "ClosedLoopRCR" => {
                let rp = add_bc_parameter(&mut model, values, "Rp", &name)?;
                let c = add_bc_parameter(&mut model, values, "C", &name)?;
                let rd = add_bc_parameter(&mut model, values, "Rd", &name)?;
                let outlet = values.flag("closed_loop_outlet");
                if outlet {
                    closed_loop_bcs.push(name.clone());
                }
                model.add_block(Box::new(ClosedLoopRcrBc::new(name, rp, c, rd, outlet)))?;
            }
            "CORONARY" => {
                let ra = add_bc_parameter(&mut model, values, "Ra1", &name)?;
                let ram = add_bc_parameter(&mut model, values, "Ra2", &name)?;
                let rv = add_bc_parameter(&mut model, values, "Rv1", &name)?;
                let ca = add_bc_parameter(&mut model, values, "Ca", &name)?;
                let cim = add_bc_parameter(&mut model, values, "Cc", &name)?;
                let pim = add_bc_parameter(&mut model, values, "Pim", &name)?;
                let pv = add_bc_parameter(&mut model, values, "P_v", &name)?;
                model.add_block(Box::new(OpenLoopCoronaryBc::new(
                    name, ra, ram, rv, ca, cim, pim, pv,
                )))?;
            }
            other => {
                return Err(ProjectError::UnknownType {
                    kind: "boundary condition",
                    name: other.to_string(),
                })
            }
        }
    }

    // Chambers
    for chamber in &config.chambers {
        if chamber.chamber_type != "ChamberElastanceInductor" {
            return Err(ProjectError::UnknownType {
                kind: "chamber",
                name: chamber.chamber_type.clone(),
            });
        }
        let name = chamber.name.clone();
        let values = &chamber.values;
        let e_max = add_bc_parameter(&mut model, values, "Emax", &name)?;
        let e_min = add_bc_parameter(&mut model, values, "Emin", &name)?;
        let vrd = add_bc_parameter(&mut model, values, "Vrd", &name)?;
        let vrs = add_bc_parameter(&mut model, values, "Vrs", &name)?;
        let t_active = add_bc_parameter(&mut model, values, "t_active", &name)?;
        let t_twitch = add_bc_parameter(&mut model, values, "t_twitch", &name)?;
        let impedance = add_bc_parameter(&mut model, values, "Impedance", &name)?;
        model.add_block(Box::new(ChamberElastanceInductor::new(
            name, e_max, e_min, vrd, vrs, t_active, t_twitch, impedance,
        )))?;
    }

    // Valves
    for valve in &config.valves {
        if valve.valve_type != "ValveTanh" {
            return Err(ProjectError::UnknownType {
                kind: "valve",
                name: valve.valve_type.clone(),
            });
        }
        let name = valve.name.clone();
        let values = &valve.params;
        let r_max = add_bc_parameter(&mut model, values, "Rmax", &name)?;
        let r_min = add_bc_parameter(&mut model, values, "Rmin", &name)?;
        let steepness = add_bc_parameter(&mut model, values, "Steepness", &name)?;
        model.add_block(Box::new(ValveTanh::new(
            name.clone(),
            r_max,
            r_min,
            steepness,
        )))?;
        connections.push((valve.upstream_block.clone(), name.clone()));
        connections.push((name, valve.downstream_block.clone()));
    }

    // Junctions
    for junction in &config.junctions {
        let name = junction.junction_name.clone();
        match junction.junction_type.as_str() {
            "NORMAL_JUNCTION" | "internal_junction" => {
                model.add_block(Box::new(Junction::new(name.clone())))?;
            }
            "resistive_junction" => {
                let values = junction
                    .junction_values
                    .as_ref()
                    .ok_or_else(|| ProjectError::MissingKey {
                        key: "junction_values".to_string(),
                        context: name.clone(),
                    })?;
                let resistances = values
                    .r
                    .iter()
                    .map(|&r| model.add_parameter(r))
                    .collect();
                model.add_block(Box::new(ResistiveJunction::new(name.clone(), resistances)))?;
            }
            "BloodVesselJunction" => {
                let values = junction
                    .junction_values
                    .as_ref()
                    .ok_or_else(|| ProjectError::MissingKey {
                        key: "junction_values".to_string(),
                        context: name.clone(),
                    })?;
                let num_outlets = junction.outlet_vessels.len();
                let at = |array: &[f64], i: usize| array.get(i).copied().unwrap_or(0.0);
                let mut branches = Vec::with_capacity(num_outlets);
                for i in 0..num_outlets {
                    let r = model.add_parameter(at(&values.r_poiseuille, i));
                    let c = (at(&values.c, i) != 0.0)
                        .then(|| model.add_parameter(at(&values.c, i)));
                    let l = (at(&values.l, i) != 0.0)
                        .then(|| model.add_parameter(at(&values.l, i)));
                    let k = (at(&values.stenosis_coefficient, i) != 0.0)
                        .then(|| model.add_parameter(at(&values.stenosis_coefficient, i)));
                    branches.push(BranchParams {
                        resistance: r,
                        capacitance: c,
                        inductance: l,
                        stenosis: k,
                    });
                }
                model.add_block(Box::new(BloodVesselJunction::new(name.clone(), branches)))?;
            }
            other => {
                return Err(ProjectError::UnknownType {
                    kind: "junction",
                    name: other.to_string(),
                })
            }
        }

        let vessel = |id: i64| -> ProjectResult<String> {
            vessel_names
                .get(&id)
                .cloned()
                .ok_or_else(|| ProjectError::Invalid {
                    what: format!("junction {name} references unknown vessel id {id}"),
                })
        };
        for &id in &junction.inlet_vessels {
            connections.push((vessel(id)?, name.clone()));
        }
        for &id in &junction.outlet_vessels {
            connections.push((name.clone(), vessel(id)?));
        }
    }

    // Closed-loop heart and pulmonary block
    let mut heart_present = false;
    for closed_loop in &config.closed_loop_blocks {
        if closed_loop.closed_loop_type != "ClosedLoopHeartAndPulmonary" {
            return Err(ProjectError::UnknownType {
                kind: "closed loop block",
                name: closed_loop.closed_loop_type.clone(),
            });
        }
        if heart_present {
            return Err(ProjectError::Invalid {
                what: "only one ClosedLoopHeartAndPulmonary block is allowed".to_string(),
            });
        }
        heart_present = true;

        let period =
            closed_loop
                .cardiac_cycle_period
                .ok_or_else(|| ProjectError::MissingKey {
                    key: "cardiac_cycle_period".to_string(),
                    context: HEART_BLOCK_NAME.to_string(),
                })?;
        if model.cardiac_cycle_period > 0.0 && model.cardiac_cycle_period != period {
            return Err(ProjectError::Invalid {
                what: format!(
                    "heart block defines cardiac cycle period {period} but the model \
                     already uses {}",
                    model.cardiac_cycle_period
                ),
            });
        }
        model.cardiac_cycle_period = period;

        let mut param_ids = Vec::with_capacity(HEART_PARAM_KEYS.len());
        for key in HEART_PARAM_KEYS {
            let value =
                closed_loop
                    .parameters
                    .get(key)
                    .ok_or_else(|| ProjectError::MissingKey {
                        key: key.to_string(),
                        context: HEART_BLOCK_NAME.to_string(),
                    })?;
            param_ids.push(model.add_parameter(*value));
        }
        let param_ids: [ParamId; 27] = param_ids.try_into().expect("27 heart parameters");
        debug_assert_eq!(heart_pulmonary::param::VASO_LA, 26);
        model.add_block(Box::new(ClosedLoopHeartPulmonary::new(
            HEART_BLOCK_NAME,
            param_ids,
        )))?;

        // Synthesized junctions wiring the loop through the heart
        model.add_block(Box::new(Junction::new("J_heart_inlet")))?;
        for inlet in &closed_loop_bcs {
            connections.push((inlet.clone(), "J_heart_inlet".to_string()));
        }
        connections.push(("J_heart_inlet".to_string(), HEART_BLOCK_NAME.to_string()));

        model.add_block(Box::new(Junction::new("J_heart_outlet")))?;
        connections.push((HEART_BLOCK_NAME.to_string(), "J_heart_outlet".to_string()));
        for outlet in &closed_loop.outlet_blocks {
            connections.push(("J_heart_outlet".to_string(), outlet.clone()));
        }
    }

    match config.simulation_parameters.steady_initial {
        Some(true) if heart_present => {
            return Err(ProjectError::Invalid {
                what: "steady_initial is not compatible with ClosedLoopHeartAndPulmonary"
                    .to_string(),
            })
        }
        Some(explicit) => params.steady_initial = explicit,
        None => params.steady_initial = !heart_present,
    }

    // Create one node per connection
    for (from, to) in &connections {
        let from_id = model.block_id(from)?;
        let to_id = model.block_id(to)?;
        model.add_node(&[from_id], &[to_id], format!("{from}:{to}"))?;
    }

    model.finalize()?;
    params.resolve_time_step(model.cardiac_cycle_period);

    // Initial state: block-defined values first, then user overrides
    let mut state = State::zero(model.num_dofs());
    model.set_block_initial_conditions(&mut state);
    apply_initial_map(&model, &config.initial_condition, &mut state.y);
    apply_initial_map(&model, &config.initial_condition_d, &mut state.ydot);

    Ok(LoadedSimulation {
        model,
        params,
        initial_state: state,
    })
}

/// Apply a user initial-condition map, handling the `pressure_all` and
/// `flow_all` wildcards before exact variable names.
fn apply_initial_map(
    model: &Model,
    map: &HashMap<String, f64>,
    target: &mut nalgebra::DVector<f64>,
) {
    if map.is_empty() {
        return;
    }
    let names = model.dofhandler.variable_names();
    for (prefix, key) in [("pressure:", "pressure_all"), ("flow:", "flow_all")] {
        if let Some(&value) = map.get(key) {
            for (i, name) in names.iter().enumerate() {
                if name.starts_with(prefix) {
                    target[i] = value;
                }
            }
        }
    }
    for (key, &value) in map {
        if key == "pressure_all" || key == "flow_all" {
            continue;
        }
        match model.dofhandler.variable_index(key) {
            Some(i) => target[i] = value,
            None => log::warn!("initial condition given for unknown variable {key}"),
        }
    }
}

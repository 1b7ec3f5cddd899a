//! Loader integration tests built from inline JSON configurations.

use hf_model::block::BlockType;
use hf_project::{load_str, ProjectError};
use hf_sim::{run_simulation, steady_initial_state};

/// Flow inlet → resistor vessel → resistance outlet.
const SINGLE_VESSEL: &str = r#"{
    "simulation_parameters": {
        "number_of_cardiac_cycles": 2,
        "number_of_time_pts_per_cardiac_cycle": 11
    },
    "boundary_conditions": [
        {
            "bc_name": "INFLOW",
            "bc_type": "FLOW",
            "bc_values": {"Q": 1.0}
        },
        {
            "bc_name": "OUT",
            "bc_type": "RESISTANCE",
            "bc_values": {"R": 0.0, "Pd": 0.0}
        }
    ],
    "vessels": [
        {
            "vessel_id": 0,
            "vessel_name": "branch0",
            "zero_d_element_type": "BloodVessel",
            "zero_d_element_values": {"R_poiseuille": 100.0},
            "boundary_conditions": {"inlet": "INFLOW", "outlet": "OUT"}
        }
    ]
}"#;

#[test]
fn single_vessel_loads_and_solves() {
    let mut loaded = load_str(SINGLE_VESSEL).unwrap();
    assert_eq!(loaded.model.num_blocks(), 3);
    assert_eq!(loaded.model.num_dofs(), 4);
    assert_eq!(
        loaded.model.get_block_type("branch0").unwrap(),
        BlockType::BloodVessel
    );
    // Defaults: 1.0 s cycle, dt = period / (pts - 1)
    assert_eq!(loaded.model.cardiac_cycle_period, 1.0);
    assert!((loaded.params.time_step_size - 0.1).abs() < 1e-14);
    assert!(loaded.params.steady_initial);

    let output = run_simulation(&mut loaded.model, &loaded.params, loaded.initial_state).unwrap();
    let last = output.states.last().unwrap();
    let p_in = last.y[loaded
        .model
        .dofhandler
        .variable_index("pressure:INFLOW:branch0")
        .unwrap()];
    assert!((p_in - 100.0).abs() < 1e-6, "P_in = {p_in}");
}

#[test]
fn blood_vessel_junction_splits_flow() {
    let config = r#"{
        "simulation_parameters": {
            "number_of_cardiac_cycles": 1,
            "number_of_time_pts_per_cardiac_cycle": 11
        },
        "boundary_conditions": [
            {"bc_name": "INFLOW", "bc_type": "FLOW", "bc_values": {"Q": 2.0}},
            {"bc_name": "OUT1", "bc_type": "RESISTANCE", "bc_values": {"R": 0.0, "Pd": 0.0}},
            {"bc_name": "OUT2", "bc_type": "RESISTANCE", "bc_values": {"R": 0.0, "Pd": 0.0}}
        ],
        "vessels": [
            {
                "vessel_id": 0,
                "vessel_name": "V0",
                "zero_d_element_type": "BloodVessel",
                "zero_d_element_values": {"R_poiseuille": 10.0},
                "boundary_conditions": {"inlet": "INFLOW"}
            },
            {
                "vessel_id": 1,
                "vessel_name": "V1",
                "zero_d_element_type": "BloodVessel",
                "zero_d_element_values": {"R_poiseuille": 0.0},
                "boundary_conditions": {"outlet": "OUT1"}
            },
            {
                "vessel_id": 2,
                "vessel_name": "V2",
                "zero_d_element_type": "BloodVessel",
                "zero_d_element_values": {"R_poiseuille": 0.0},
                "boundary_conditions": {"outlet": "OUT2"}
            }
        ],
        "junctions": [
            {
                "junction_name": "BVJ",
                "junction_type": "BloodVesselJunction",
                "inlet_vessels": [0],
                "outlet_vessels": [1, 2],
                "junction_values": {"R_poiseuille": [200.0, 300.0]}
            }
        ]
    }"#;

    let mut loaded = load_str(config).unwrap();
    let state = steady_initial_state(
        &mut loaded.model,
        &loaded.initial_state,
        loaded.params.abs_tol,
        loaded.params.max_nonlinear_iterations,
    )
    .unwrap();

    let flow = |name: &str| {
        state.y[loaded.model.dofhandler.variable_index(name).unwrap()]
    };
    let q1 = flow("flow:BVJ:V1");
    let q2 = flow("flow:BVJ:V2");
    assert!((q1 - 1.2).abs() < 1e-6, "Q1 = {q1}");
    assert!((q2 - 0.8).abs() < 1e-6, "Q2 = {q2}");
}

#[test]
fn unknown_bc_type_is_rejected() {
    let config = r#"{
        "simulation_parameters": {
            "number_of_cardiac_cycles": 1,
            "number_of_time_pts_per_cardiac_cycle": 11
        },
        "boundary_conditions": [
            {"bc_name": "X", "bc_type": "WAVEFORM", "bc_values": {"Q": 1.0}}
        ]
    }"#;
    let err = load_str(config).unwrap_err();
    assert!(matches!(err, ProjectError::UnknownType { .. }), "{err}");
}

#[test]
fn missing_simulation_keys_are_rejected() {
    let err = load_str(r#"{"simulation_parameters": {}}"#).unwrap_err();
    assert!(matches!(err, ProjectError::MissingKey { .. }), "{err}");

    let err = load_str(r#"{"simulation_parameters": {"coupled_simulation": true}}"#).unwrap_err();
    assert!(matches!(err, ProjectError::MissingKey { .. }), "{err}");
}

#[test]
fn inconsistent_cycle_periods_are_rejected() {
    let config = r#"{
        "simulation_parameters": {
            "number_of_cardiac_cycles": 1,
            "number_of_time_pts_per_cardiac_cycle": 11
        },
        "boundary_conditions": [
            {
                "bc_name": "INFLOW",
                "bc_type": "FLOW",
                "bc_values": {"t": [0.0, 0.5, 1.0], "Q": [0.0, 1.0, 0.5]}
            },
            {
                "bc_name": "OUT",
                "bc_type": "PRESSURE",
                "bc_values": {"t": [0.0, 0.4, 0.8], "P": [0.0, 1.0, 0.5]}
            }
        ]
    }"#;
    let err = load_str(config).unwrap_err();
    assert!(matches!(err, ProjectError::Model(_)), "{err}");
}

#[test]
fn external_coupling_blocks_are_rejected() {
    let config = r#"{
        "simulation_parameters": {
            "number_of_cardiac_cycles": 1,
            "number_of_time_pts_per_cardiac_cycle": 11
        },
        "external_solver_coupling_blocks": [{"name": "interface"}]
    }"#;
    let err = load_str(config).unwrap_err();
    assert!(matches!(err, ProjectError::ExternalCoupling), "{err}");
}

fn heart_config(steady_line: &str) -> String {
    format!(
        r#"{{
        "simulation_parameters": {{
            "number_of_cardiac_cycles": 2,
            "number_of_time_pts_per_cardiac_cycle": 11{steady_line}
        }},
        "boundary_conditions": [
            {{
                "bc_name": "CLRCR",
                "bc_type": "ClosedLoopRCR",
                "bc_values": {{"Rp": 100.0, "C": 1e-4, "Rd": 1000.0, "closed_loop_outlet": true}}
            }}
        ],
        "vessels": [
            {{
                "vessel_id": 0,
                "vessel_name": "aorta",
                "zero_d_element_type": "BloodVessel",
                "zero_d_element_values": {{"R_poiseuille": 50.0}},
                "boundary_conditions": {{"outlet": "CLRCR"}}
            }}
        ],
        "closed_loop_blocks": [
            {{
                "closed_loop_type": "ClosedLoopHeartAndPulmonary",
                "cardiac_cycle_period": 0.8,
                "outlet_blocks": ["aorta"],
                "parameters": {{
                    "Tsa": 0.35, "tpwave": 8.0, "Erv_s": 1.15, "Elv_s": 2.75,
                    "iml": 1.0, "imr": 1.0,
                    "Lra_v": 0.1, "Rra_v": 5.0, "Lrv_a": 0.1, "Rrv_a": 5.0,
                    "Lla_v": 0.1, "Rla_v": 5.0, "Llv_a": 0.1, "Rlv_ao": 10.0,
                    "Vrv_u": 10.0, "Vlv_u": 10.0,
                    "Rpd": 5.0, "Cp": 0.5, "Cpa": 1.0,
                    "Kxp_ra": 10.0, "Kxv_ra": 0.01, "Kxp_la": 10.0, "Kxv_la": 0.01,
                    "Emax_ra": 0.3, "Emax_la": 0.3, "Vaso_ra": 10.0, "Vaso_la": 10.0
                }}
            }}
        ]
    }}"#
    )
}

#[test]
fn heart_block_wires_the_loop() {
    let loaded = load_str(&heart_config("")).unwrap();
    // Heart + two synthesized junctions + vessel + RCR
    assert_eq!(loaded.model.num_blocks(), 5);
    assert!(loaded.model.get_block("J_heart_inlet").is_ok());
    assert!(loaded.model.get_block("J_heart_outlet").is_ok());
    assert_eq!(loaded.model.cardiac_cycle_period, 0.8);
    // Steady initialization is silently disabled by the heart block
    assert!(!loaded.params.steady_initial);
    // Heart-defined chamber volumes show up in the initial state
    let v_ra = loaded
        .model
        .dofhandler
        .variable_index("V_RA:CLH")
        .unwrap();
    assert_eq!(loaded.initial_state.y[v_ra], 38.43);
}

#[test]
fn heart_with_explicit_steady_initial_is_an_error() {
    let err = load_str(&heart_config(",\n\"steady_initial\": true")).unwrap_err();
    assert!(matches!(err, ProjectError::Invalid { .. }), "{err}");
}

#[test]
fn initial_condition_wildcards_apply() {
    let config = r#"{
        "simulation_parameters": {
            "number_of_cardiac_cycles": 1,
            "number_of_time_pts_per_cardiac_cycle": 11
        },
        "boundary_conditions": [
            {"bc_name": "INFLOW", "bc_type": "FLOW", "bc_values": {"Q": 1.0}},
            {"bc_name": "OUT", "bc_type": "RESISTANCE", "bc_values": {"R": 0.0, "Pd": 0.0}}
        ],
        "vessels": [
            {
                "vessel_id": 0,
                "vessel_name": "V0",
                "zero_d_element_type": "BloodVessel",
                "zero_d_element_values": {"R_poiseuille": 100.0},
                "boundary_conditions": {"inlet": "INFLOW", "outlet": "OUT"}
            }
        ],
        "initial_condition": {
            "pressure_all": 7.0,
            "flow_all": 2.0,
            "pressure:V0:OUT": 3.0
        }
    }"#;
    let loaded = load_str(config).unwrap();
    let index = |name: &str| loaded.model.dofhandler.variable_index(name).unwrap();
    assert_eq!(loaded.initial_state.y[index("pressure:INFLOW:V0")], 7.0);
    assert_eq!(loaded.initial_state.y[index("flow:INFLOW:V0")], 2.0);
    assert_eq!(loaded.initial_state.y[index("pressure:V0:OUT")], 3.0);
}

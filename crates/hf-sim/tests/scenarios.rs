//! End-to-end solver scenarios on hand-built models.

use hf_algebra::State;
use hf_model::blocks::{
    BloodVessel, FlowReferenceBc, Junction, PressureReferenceBc, ValveTanh, WindkesselBc,
};
use hf_model::Model;
use hf_sim::{run_simulation, steady_initial_state, SimulationParameters};

const ATOL: f64 = 1e-8;
const MAX_ITER: usize = 30;

/// Constant-flow BC into a resistor vessel against a zero-pressure BC.
#[test]
fn single_resistor_steady_state() {
    let mut model = Model::new();
    let q = model.add_parameter(1.0);
    let r = model.add_parameter(100.0);
    let p = model.add_parameter(0.0);

    let inflow = model
        .add_block(Box::new(FlowReferenceBc::new("INFLOW", q)))
        .unwrap();
    let vessel = model
        .add_block(Box::new(BloodVessel::new("V0", r, None, None, None)))
        .unwrap();
    let outlet = model
        .add_block(Box::new(PressureReferenceBc::new("OUT", p)))
        .unwrap();
    model.add_node(&[inflow], &[vessel], "INFLOW:V0").unwrap();
    model.add_node(&[vessel], &[outlet], "V0:OUT").unwrap();
    model.finalize().unwrap();

    let n_dofs = model.num_dofs();
    let state = steady_initial_state(&mut model, &State::zero(n_dofs), ATOL, MAX_ITER).unwrap();

    let p_in = state.y[0];
    let p_out = state.y[2];
    // P_in − P_out = R·Q within 10·atol
    assert!((p_in - 100.0).abs() < 10.0 * ATOL, "P_in = {p_in}");
    assert!(p_out.abs() < 10.0 * ATOL, "P_out = {p_out}");
    assert!((state.y[1] - 1.0).abs() < 10.0 * ATOL);
    assert!((state.y[3] - 1.0).abs() < 10.0 * ATOL);
}

/// RCR Windkessel driven by a sinusoidal flow: the pressure signal becomes
/// cycle-periodic after the transient dies out.
#[test]
fn windkessel_reaches_periodic_orbit() {
    let pts = 101usize;
    let times: Vec<f64> = (0..pts).map(|i| i as f64 / (pts - 1) as f64).collect();
    let flows: Vec<f64> = times
        .iter()
        .map(|t| (2.0 * std::f64::consts::PI * t).sin())
        .collect();

    let mut model = Model::new();
    let q = model.add_parameter_curve(times, flows, true).unwrap();
    let rp = model.add_parameter(100.0);
    let c = model.add_parameter(1e-4);
    let rd = model.add_parameter(1000.0);
    let pd = model.add_parameter(0.0);

    let inflow = model
        .add_block(Box::new(FlowReferenceBc::new("INFLOW", q)))
        .unwrap();
    let rcr = model
        .add_block(Box::new(WindkesselBc::new("RCR", rp, c, rd, pd)))
        .unwrap();
    model.add_node(&[inflow], &[rcr], "INFLOW:RCR").unwrap();
    model.finalize().unwrap();
    assert_eq!(model.cardiac_cycle_period, 1.0);

    let mut params = SimulationParameters::uncoupled(3, pts);
    params.resolve_time_step(model.cardiac_cycle_period);
    params.output_all_cycles = true;

    let initial = State::zero(model.num_dofs());
    let output = run_simulation(&mut model, &params, initial).unwrap();
    assert_eq!(output.states.len(), 3 * (pts - 1) + 1);

    // Compare the inlet pressure over cycles 2 and 3
    let steps = pts - 1;
    let pressure = |i: usize| output.states[i].y[0];
    let scale = (0..output.states.len())
        .map(|i| pressure(i).abs())
        .fold(0.0, f64::max);
    for i in 0..steps {
        let diff = (pressure(steps + i) - pressure(2 * steps + i)).abs();
        assert!(
            diff <= 1e-4 * scale,
            "cycle mismatch at sample {i}: {diff:.3e} vs scale {scale:.3e}"
        );
    }
}

/// Junction mass conservation: flow splits inversely to the outlet
/// resistances.
#[test]
fn junction_splits_flow_by_resistance() {
    let mut model = Model::new();
    let q = model.add_parameter(2.0);
    let r_in = model.add_parameter(10.0);
    let r_a = model.add_parameter(200.0);
    let r_b = model.add_parameter(300.0);
    let p = model.add_parameter(0.0);

    let inflow = model
        .add_block(Box::new(FlowReferenceBc::new("INFLOW", q)))
        .unwrap();
    let v_in = model
        .add_block(Box::new(BloodVessel::new("V_in", r_in, None, None, None)))
        .unwrap();
    let junction = model.add_block(Box::new(Junction::new("J0"))).unwrap();
    let v_a = model
        .add_block(Box::new(BloodVessel::new("V_a", r_a, None, None, None)))
        .unwrap();
    let v_b = model
        .add_block(Box::new(BloodVessel::new("V_b", r_b, None, None, None)))
        .unwrap();
    let out_a = model
        .add_block(Box::new(PressureReferenceBc::new("OUT_a", p)))
        .unwrap();
    let out_b = model
        .add_block(Box::new(PressureReferenceBc::new("OUT_b", p)))
        .unwrap();

    model.add_node(&[inflow], &[v_in], "INFLOW:V_in").unwrap();
    model.add_node(&[v_in], &[junction], "V_in:J0").unwrap();
    model.add_node(&[junction], &[v_a], "J0:V_a").unwrap();
    model.add_node(&[junction], &[v_b], "J0:V_b").unwrap();
    model.add_node(&[v_a], &[out_a], "V_a:OUT_a").unwrap();
    model.add_node(&[v_b], &[out_b], "V_b:OUT_b").unwrap();
    model.finalize().unwrap();

    let n_dofs = model.num_dofs();
    let state = steady_initial_state(&mut model, &State::zero(n_dofs), ATOL, MAX_ITER).unwrap();

    let q_a = state.y[model.node(model.block(v_a).core().outlet_nodes[0]).flow_dof];
    let q_b = state.y[model.node(model.block(v_b).core().outlet_nodes[0]).flow_dof];
    assert!((q_a - 1.2).abs() < 1e-6, "Q_a = {q_a}");
    assert!((q_b - 0.8).abs() < 1e-6, "Q_b = {q_b}");
    assert!((q_a + q_b - 2.0).abs() < 1e-8);
}

/// Stenosis only: ΔP = K·|Q|·Q.
#[test]
fn stenosis_pressure_drop_is_quadratic() {
    let mut model = Model::new();
    let q = model.add_parameter(2.0);
    let r = model.add_parameter(0.0);
    let k = model.add_parameter(50.0);
    let p = model.add_parameter(0.0);

    let inflow = model
        .add_block(Box::new(FlowReferenceBc::new("INFLOW", q)))
        .unwrap();
    model
        .add_block(Box::new(BloodVessel::new("V0", r, None, None, Some(k))))
        .unwrap();
    let vessel = model.block_id("V0").unwrap();
    let outlet = model
        .add_block(Box::new(PressureReferenceBc::new("OUT", p)))
        .unwrap();
    model.add_node(&[inflow], &[vessel], "INFLOW:V0").unwrap();
    model.add_node(&[vessel], &[outlet], "V0:OUT").unwrap();
    model.finalize().unwrap();

    let n_dofs = model.num_dofs();
    let state = steady_initial_state(&mut model, &State::zero(n_dofs), ATOL, MAX_ITER).unwrap();

    let dp = state.y[0] - state.y[2];
    assert!((dp - 200.0).abs() < 1e-6, "ΔP = {dp}");
}

/// A valve with infinite steepness produces a non-finite linearization;
/// the step fails cleanly and the pre-step state stays untouched.
#[test]
fn degenerate_valve_aborts_cleanly() {
    let pts = 11usize;
    let times: Vec<f64> = (0..pts).map(|i| i as f64 / (pts - 1) as f64).collect();
    let pressures: Vec<f64> = times
        .iter()
        .map(|t| (2.0 * std::f64::consts::PI * t).sin())
        .collect();

    let mut model = Model::new();
    let p_in = model.add_parameter_curve(times, pressures, true).unwrap();
    let r_max = model.add_parameter(1e10);
    let r_min = model.add_parameter(1e-10);
    let steep = model.add_parameter(f64::INFINITY);
    let p_out = model.add_parameter(0.0);

    let src = model
        .add_block(Box::new(PressureReferenceBc::new("SRC", p_in)))
        .unwrap();
    let valve = model
        .add_block(Box::new(ValveTanh::new("VALVE", r_max, r_min, steep)))
        .unwrap();
    let sink = model
        .add_block(Box::new(PressureReferenceBc::new("SINK", p_out)))
        .unwrap();
    model.add_node(&[src], &[valve], "SRC:VALVE").unwrap();
    model.add_node(&[valve], &[sink], "VALVE:SINK").unwrap();
    model.finalize().unwrap();

    let mut params = SimulationParameters::uncoupled(1, pts);
    params.resolve_time_step(model.cardiac_cycle_period);
    params.steady_initial = false;

    let initial = State::zero(model.num_dofs());
    let err = run_simulation(&mut model, &params, initial.clone());
    assert!(err.is_err(), "degenerate valve must not converge");
    // The caller's last state is untouched by the failed run
    assert_eq!(initial, State::zero(model.num_dofs()));
}

/// Steady/unsteady round trip leaves every parameter bitwise identical.
#[test]
fn steady_round_trip_is_identity() {
    let pts = 21usize;
    let times: Vec<f64> = (0..pts).map(|i| i as f64 / (pts - 1) as f64).collect();
    let flows: Vec<f64> = times
        .iter()
        .map(|t| 1.0 + (2.0 * std::f64::consts::PI * t).cos())
        .collect();

    let mut model = Model::new();
    let q = model.add_parameter_curve(times.clone(), flows, true).unwrap();
    let rp = model.add_parameter(100.0);
    let c = model.add_parameter(1e-4);
    let rd = model.add_parameter(1000.0);
    let pd = model.add_parameter(5.0);

    let inflow = model
        .add_block(Box::new(FlowReferenceBc::new("INFLOW", q)))
        .unwrap();
    let rcr = model
        .add_block(Box::new(WindkesselBc::new("RCR", rp, c, rd, pd)))
        .unwrap();
    model.add_node(&[inflow], &[rcr], "INFLOW:RCR").unwrap();
    model.finalize().unwrap();

    let probe_times: Vec<f64> = (0..40).map(|i| i as f64 * 0.05).collect();
    let snapshot = |model: &Model| -> Vec<f64> {
        model
            .parameters()
            .iter()
            .flat_map(|p| probe_times.iter().map(|&t| p.get(t)).collect::<Vec<_>>())
            .collect()
    };

    let before = snapshot(&model);
    model.to_steady();
    let frozen = snapshot(&model);
    assert_ne!(before, frozen, "steady mode must change the flow curve");
    model.to_unsteady();
    let after = snapshot(&model);
    assert_eq!(before, after);
}

//! Steady initialization and the outer time loop.

use hf_algebra::{Integrator, State};
use hf_model::block::BlockType;
use hf_model::Model;

use crate::error::{SimError, SimResult};
use crate::params::SimulationParameters;

/// Spectral radius of the generalized-alpha scheme.
const RHO: f64 = 0.1;

/// Number of coarse steps for the steady pre-run.
const STEADY_STEPS: usize = 31;

/// Sampled simulation results.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub times: Vec<f64>,
    pub states: Vec<State>,
}

/// Relax the model to its steady solution.
///
/// Freezes all parameter curves, suppresses the capacitive terms, and runs
/// a few coarse implicit steps (Δt = cycle/10) from `initial`; the final
/// state seeds the main loop. The model is restored to unsteady behavior
/// before returning.
pub fn steady_initial_state(
    model: &mut Model,
    initial: &State,
    abs_tol: f64,
    max_iter: usize,
) -> SimResult<State> {
    if model.has_block_type(BlockType::ClosedLoopHeartPulmonary) {
        return Err(SimError::SteadyWithHeart);
    }

    let dt = model.cardiac_cycle_period / 10.0;
    let size = model.num_dofs();
    model.to_steady();

    let mut integrator = Integrator::new(model, size, dt, RHO, abs_tol, max_iter);
    integrator.system_mut().reserve(model.get_num_triplets());

    let mut state = initial.clone();
    let result: SimResult<State> = (|| {
        for i in 0..STEADY_STEPS {
            state = integrator.step(&state, dt * i as f64, model)?;
        }
        Ok(state)
    })();

    model.to_unsteady();
    log::debug!(
        "steady initialization finished ({:.1} Newton iterations/step)",
        integrator.avg_nonlin_iter()
    );
    result
}

/// Run the full simulation, sampling states for output.
///
/// `output_interval` keeps every k-th step; unless `output_all_cycles` is
/// set, only the final cardiac cycle is kept and its times are shifted to
/// start at zero.
pub fn run_simulation(
    model: &mut Model,
    params: &SimulationParameters,
    initial: State,
) -> SimResult<SimulationOutput> {
    if params.time_step_size <= 0.0 {
        return Err(SimError::InvalidSetup {
            what: "time step size is not resolved",
        });
    }
    if params.num_time_steps < 2 {
        return Err(SimError::InvalidSetup {
            what: "need at least two time points",
        });
    }

    let mut state = if params.steady_initial {
        steady_initial_state(model, &initial, params.abs_tol, params.max_nonlinear_iterations)?
    } else {
        initial
    };

    let dt = params.time_step_size;
    let size = model.num_dofs();
    let mut integrator = Integrator::new(
        model,
        size,
        dt,
        RHO,
        params.abs_tol,
        params.max_nonlinear_iterations,
    );
    integrator.system_mut().reserve(model.get_num_triplets());

    let mut times = Vec::new();
    let mut states = Vec::new();
    // First step that belongs to the final cycle
    let start_last_cycle = params.num_time_steps.saturating_sub(params.pts_per_cycle);

    let mut time = 0.0;
    if params.output_all_cycles || start_last_cycle == 0 {
        times.push(time);
        states.push(state.clone());
    }

    let mut interval_counter = 0;
    for i in 1..params.num_time_steps {
        state = integrator.step(&state, time, model)?;
        time = dt * i as f64;
        interval_counter += 1;

        let at_cycle_start = !params.output_all_cycles && i == start_last_cycle;
        if interval_counter == params.output_interval || at_cycle_start {
            if params.output_all_cycles || i >= start_last_cycle {
                times.push(time);
                states.push(state.clone());
            }
            interval_counter = 0;
        }
    }

    if !params.output_all_cycles {
        if let Some(&start) = times.first() {
            for t in &mut times {
                *t -= start;
            }
        }
    }

    log::info!(
        "simulation finished: {} steps, {:.1} Newton iterations/step",
        params.num_time_steps - 1,
        integrator.avg_nonlin_iter()
    );
    Ok(SimulationOutput { times, states })
}

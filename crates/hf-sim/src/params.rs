//! Simulation parameter set and time-step derivations.

/// Resolved simulation parameters.
///
/// For an ordinary (uncoupled) run the step count and step size derive
/// from the cardiac cycle; a coupled run receives its total step count and
/// external step size from the embedding solver.
#[derive(Debug, Clone)]
pub struct SimulationParameters {
    pub num_cycles: usize,
    pub pts_per_cycle: usize,
    pub coupled: bool,
    pub num_time_steps: usize,
    pub external_step_size: f64,
    /// Time step size; resolved once the cardiac cycle period is known
    pub time_step_size: f64,
    pub abs_tol: f64,
    pub max_nonlinear_iterations: usize,
    pub steady_initial: bool,
    pub output_interval: usize,
    pub output_mean_only: bool,
    pub output_variable_based: bool,
    pub output_derivative: bool,
    pub output_all_cycles: bool,
}

impl SimulationParameters {
    /// Parameters for an uncoupled run over whole cardiac cycles.
    pub fn uncoupled(num_cycles: usize, pts_per_cycle: usize) -> Self {
        Self {
            num_cycles,
            pts_per_cycle,
            coupled: false,
            num_time_steps: (pts_per_cycle - 1) * num_cycles + 1,
            external_step_size: 0.1,
            time_step_size: 0.0,
            abs_tol: 1e-8,
            max_nonlinear_iterations: 30,
            steady_initial: true,
            output_interval: 1,
            output_mean_only: false,
            output_variable_based: false,
            output_derivative: false,
            output_all_cycles: false,
        }
    }

    /// Parameters for a run coupled to an external solver.
    pub fn coupled(num_time_steps: usize, external_step_size: f64) -> Self {
        Self {
            num_cycles: 1,
            // A coupled run has no cycle structure; treat the whole run as
            // one cycle for output bookkeeping.
            pts_per_cycle: num_time_steps,
            coupled: true,
            num_time_steps,
            external_step_size,
            time_step_size: 0.0,
            abs_tol: 1e-8,
            max_nonlinear_iterations: 30,
            steady_initial: true,
            output_interval: 1,
            output_mean_only: false,
            output_variable_based: false,
            output_derivative: false,
            output_all_cycles: false,
        }
    }

    /// Resolve the time step size once the cycle period is known.
    pub fn resolve_time_step(&mut self, cardiac_cycle_period: f64) {
        self.time_step_size = if self.coupled {
            self.external_step_size / (self.num_time_steps as f64 - 1.0)
        } else {
            cardiac_cycle_period / (self.pts_per_cycle as f64 - 1.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncoupled_derivations() {
        let mut params = SimulationParameters::uncoupled(3, 101);
        assert_eq!(params.num_time_steps, 301);
        params.resolve_time_step(1.0);
        assert!((params.time_step_size - 0.01).abs() < 1e-14);
    }

    #[test]
    fn coupled_derivations() {
        let mut params = SimulationParameters::coupled(11, 0.1);
        params.resolve_time_step(1.0);
        assert!((params.time_step_size - 0.01).abs() < 1e-14);
    }
}

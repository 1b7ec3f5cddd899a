//! Cardiac chamber as a time-varying elastance with outlet impedance.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::{cycle_phase, ParamId};

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Chamber pressurized by a twitch-activated elastance, with the chamber
/// volume `V_c` as an internal variable and an inductive outlet.
///
/// ```text
/// P_in − E(t)·(V_c − V_rest(t)) = 0
/// Q_in − Q_out − V̇_c            = 0
/// P_in − P_out − L·Q̇_out        = 0
/// ```
///
/// Activation is a half-cosine twitch starting at `t_active` and lasting
/// `t_twitch` within each cardiac cycle; elastance and rest volume slide
/// between their diastolic and systolic values with it.
pub struct ChamberElastanceInductor {
    core: BlockCore,
    e_max: ParamId,
    e_min: ParamId,
    v_rest_diastole: ParamId,
    v_rest_systole: ParamId,
    t_active: ParamId,
    t_twitch: ParamId,
    impedance: ParamId,
    cycle_period: f64,
    /// Elastance and rest volume at the current time
    elastance: f64,
    v_rest: f64,
}

impl ChamberElastanceInductor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        e_max: ParamId,
        e_min: ParamId,
        v_rest_diastole: ParamId,
        v_rest_systole: ParamId,
        t_active: ParamId,
        t_twitch: ParamId,
        impedance: ParamId,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            e_max,
            e_min,
            v_rest_diastole,
            v_rest_systole,
            t_active,
            t_twitch,
            impedance,
            cycle_period: 1.0,
            elastance: 0.0,
            v_rest: 0.0,
        }
    }

    fn activation(&self, params: &ParameterStore, time: f64) -> f64 {
        let t_active = params.value(self.t_active);
        let t_twitch = params.value(self.t_twitch);
        let t_in_cycle = cycle_phase(time, self.cycle_period);
        if t_in_cycle < t_active {
            return 0.0;
        }
        let t_contract = t_in_cycle - t_active;
        if t_contract <= t_twitch {
            0.5 - 0.5 * (2.0 * std::f64::consts::PI * t_contract / t_twitch).cos()
        } else {
            0.0
        }
    }
}

impl Block for ChamberElastanceInductor {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::ChamberElastance
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 3, &["volume_c"]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(7, 2, 0)
    }

    fn set_model_dependent_params(&mut self, cardiac_cycle_period: f64) {
        self.cycle_period = cardiac_cycle_period;
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let (p_in, q_in, p_out, q_out, v_c) = (vars[0], vars[1], vars[2], vars[3], vars[4]);

        system.set(MatrixKind::F, eqns[0], p_in, 1.0);

        system.set(MatrixKind::F, eqns[1], q_in, 1.0);
        system.set(MatrixKind::F, eqns[1], q_out, -1.0);
        system.set(MatrixKind::E, eqns[1], v_c, -1.0);

        system.set(MatrixKind::F, eqns[2], p_in, 1.0);
        system.set(MatrixKind::F, eqns[2], p_out, -1.0);
        system.set(MatrixKind::E, eqns[2], q_out, -params.value(self.impedance));
    }

    fn update_time(&mut self, system: &mut SparseSystem, params: &ParameterStore, time: f64) {
        let act = self.activation(params, time);
        let e_max = params.value(self.e_max);
        let e_min = params.value(self.e_min);
        let v_rd = params.value(self.v_rest_diastole);
        let v_rs = params.value(self.v_rest_systole);
        self.elastance = e_min + (e_max - e_min) * act;
        self.v_rest = v_rs + (1.0 - act) * (v_rd - v_rs);

        let eqns = &self.core.global_eqn_ids;
        let v_c = self.core.global_var_ids[4];
        system.set(MatrixKind::F, eqns[0], v_c, -self.elastance);
        system.set_c(eqns[0], self.elastance * self.v_rest);
    }
}

//! Closed-loop heart and pulmonary circulation macro-block.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, State, TripletCounts};
use hf_core::{cycle_phase, ParamId};
use nalgebra::DVector;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Indices into the 27-entry heart parameter array.
pub mod param {
    pub const TSA: usize = 0; // Atrial activation duration (cycle fraction)
    pub const TPWAVE: usize = 1; // P-wave shift divisor
    pub const ERV_S: usize = 2; // Right ventricle elastance scaling
    pub const ELV_S: usize = 3; // Left ventricle elastance scaling
    pub const IML: usize = 4; // Intramyocardial pressure scaling, left
    pub const IMR: usize = 5; // Intramyocardial pressure scaling, right
    pub const LRA_V: usize = 6;
    pub const RRA_V: usize = 7;
    pub const LRV_A: usize = 8;
    pub const RRV_A: usize = 9;
    pub const LLA_V: usize = 10;
    pub const RLA_V: usize = 11;
    pub const LLV_A: usize = 12;
    pub const RLV_AO: usize = 13;
    pub const VRV_U: usize = 14;
    pub const VLV_U: usize = 15;
    pub const RPD: usize = 16;
    pub const CP: usize = 17;
    pub const CPA: usize = 18;
    pub const KXP_RA: usize = 19;
    pub const KXV_RA: usize = 20;
    pub const KXP_LA: usize = 21;
    pub const KXV_LA: usize = 22;
    pub const EMAX_RA: usize = 23;
    pub const EMAX_LA: usize = 24;
    pub const VASO_RA: usize = 25;
    pub const VASO_LA: usize = 26;
}

/// Fourier modes of the normalized ventricular elastance waveform
/// (cosine, sine) pairs.
const ELASTANCE_MODES: [(f64, f64); 25] = [
    (0.283748803, 0.000000000),
    (0.031830626, -0.374299825),
    (-0.209472400, -0.018127770),
    (0.020520047, 0.073971113),
    (0.008316883, -0.047249597),
    (-0.041677660, 0.003212163),
    (0.000867323, 0.019441411),
    (-0.001675379, -0.005565534),
    (-0.011252277, 0.003401432),
    (-0.000414677, 0.008376795),
    (0.000253749, -0.000071880),
    (-0.002584966, 0.001566861),
    (0.000584752, 0.003143555),
    (0.000028502, -0.000024787),
    (0.000022961, -0.000007476),
    (0.000018735, -0.000001281),
    (0.000015573, 0.000001781),
    (0.000013133, 0.000003494),
    (0.000011199, 0.000004507),
    (0.000009634, 0.000005117),
    (0.000008343, 0.000005481),
    (0.000007265, 0.000005687),
    (0.000006354, 0.000005789),
    (0.000005575, 0.000005821),
    (0.000004903, 0.000005805),
];

/// Variable layout: `[P_in(RA), Q_in, P_out(aorta), Q_out]` followed by the
/// twelve internal states.
const V_RA: usize = 4;
const Q_RA: usize = 5;
const P_RV: usize = 6;
const V_RV: usize = 7;
const Q_RV: usize = 8;
const P_PUL: usize = 9;
const P_LA: usize = 10;
const V_LA: usize = 11;
const Q_LA: usize = 12;
const P_LV: usize = 13;
const V_LV: usize = 14;
const Q_LV: usize = 15;

/// Mechanics of the four heart chambers plus the pulmonary circulation.
///
/// The inlet node is the right atrium, the outlet node the aorta. Chamber
/// valves are ideal diodes: a chamber outflow is switched off (and its
/// iterate clamped to zero) when the downstream pressure exceeds the
/// chamber pressure with non-positive flow.
///
/// This block pins the model's cardiac cycle period and is incompatible
/// with steady initialization.
pub struct ClosedLoopHeartPulmonary {
    core: BlockCore,
    params: [ParamId; 27],
    cycle_period: f64,
    /// Atrial activation and ventricular elastances at the current time
    aa: f64,
    elv: f64,
    erv: f64,
    /// Atrial pressure-volume expressions at the current iterate
    psi_ra: f64,
    psi_la: f64,
    psi_ra_derivative: f64,
    psi_la_derivative: f64,
    valves: [f64; 16],
}

impl ClosedLoopHeartPulmonary {
    pub fn new(name: impl Into<String>, params: [ParamId; 27]) -> Self {
        Self {
            core: BlockCore::new(name),
            params,
            cycle_period: 1.0,
            aa: 0.0,
            elv: 0.0,
            erv: 0.0,
            psi_ra: 0.0,
            psi_la: 0.0,
            psi_ra_derivative: 0.0,
            psi_la_derivative: 0.0,
            valves: [1.0; 16],
        }
    }

    fn value(&self, params: &ParameterStore, which: usize) -> f64 {
        params.value(self.params[which])
    }

    /// Atrial activation and the Fourier-series ventricular elastances.
    fn update_activation(&mut self, params: &ParameterStore, time: f64) {
        let period = self.cycle_period;
        let tsa = period * self.value(params, param::TSA);
        let tpwave = period / self.value(params, param::TPWAVE);
        let t_in_cycle = cycle_phase(time, period);

        let two_pi = 2.0 * std::f64::consts::PI;
        self.aa = if t_in_cycle <= tpwave {
            0.5 * (1.0 - (two_pi * (t_in_cycle - tpwave + tsa) / tsa).cos())
        } else if t_in_cycle >= (period - tsa) + tpwave && t_in_cycle < period {
            0.5 * (1.0 - (two_pi * (t_in_cycle - tpwave - (period - tsa)) / tsa).cos())
        } else {
            0.0
        };

        let mut elastance = 0.0;
        for (i, (re, im)) in ELASTANCE_MODES.iter().enumerate() {
            let arg = two_pi * i as f64 * t_in_cycle / period;
            elastance += re * arg.cos() - im * arg.sin();
        }
        self.elv = elastance * self.value(params, param::ELV_S);
        self.erv = elastance * self.value(params, param::ERV_S);
    }

    /// Exponential atrial pressure-volume relations and their slopes.
    fn update_atrial_psi(&mut self, params: &ParameterStore, y: &DVector<f64>) {
        let vars = &self.core.global_var_ids;
        let ra_volume = y[vars[V_RA]];
        let la_volume = y[vars[V_LA]];
        let kxp_ra = self.value(params, param::KXP_RA);
        let kxv_ra = self.value(params, param::KXV_RA);
        let kxp_la = self.value(params, param::KXP_LA);
        let kxv_la = self.value(params, param::KXV_LA);
        let vaso_ra = self.value(params, param::VASO_RA);
        let vaso_la = self.value(params, param::VASO_LA);

        self.psi_ra = kxp_ra * (((ra_volume - vaso_ra) * kxv_ra).exp() - 1.0);
        self.psi_la = kxp_la * (((la_volume - vaso_la) * kxv_la).exp() - 1.0);
        self.psi_ra_derivative = kxp_ra * ((ra_volume - vaso_ra) * kxv_ra).exp() * kxv_ra;
        self.psi_la_derivative = kxp_la * ((la_volume - vaso_la) * kxv_la).exp() * kxv_la;
    }

    /// Ideal-diode valve positions; closing a valve also clamps the
    /// reverse flow out of the iterate.
    fn update_valve_positions(&mut self, y: &mut DVector<f64>) {
        let vars = &self.core.global_var_ids;
        self.valves = [1.0; 16];

        // RA to RV
        if y[vars[0]] <= y[vars[P_RV]] && y[vars[Q_RA]] <= 0.0 {
            self.valves[Q_RA] = 0.0;
            y[vars[Q_RA]] = 0.0;
        }
        // RV to pulmonary
        if y[vars[P_RV]] <= y[vars[P_PUL]] && y[vars[Q_RV]] <= 0.0 {
            self.valves[Q_RV] = 0.0;
            y[vars[Q_RV]] = 0.0;
        }
        // LA to LV
        if y[vars[P_LA]] <= y[vars[P_LV]] && y[vars[Q_LA]] <= 0.0 {
            self.valves[Q_LA] = 0.0;
            y[vars[Q_LA]] = 0.0;
        }
        // LV to aorta
        if y[vars[P_LV]] <= y[vars[2]] && y[vars[Q_LV]] <= 0.0 {
            self.valves[Q_LV] = 0.0;
            y[vars[Q_LV]] = 0.0;
        }
    }
}

impl Block for ClosedLoopHeartPulmonary {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::ClosedLoopHeartPulmonary
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(
            dofs,
            nodes,
            14,
            &[
                "V_RA", "Q_RA", "P_RV", "V_RV", "Q_RV", "P_pul", "P_LA", "V_LA", "Q_LA", "P_LV",
                "V_LV", "Q_LV",
            ],
        );
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(33, 10, 2)
    }

    fn set_model_dependent_params(&mut self, cardiac_cycle_period: f64) {
        self.cycle_period = cardiac_cycle_period;
    }

    fn set_initial_condition(&self, state: &mut State) {
        let vars = &self.core.global_var_ids;
        state.y[vars[V_RA]] = 38.43;
        state.y[vars[V_RV]] = 96.07;
        state.y[vars[V_LA]] = 38.43;
        state.y[vars[V_LV]] = 96.07;
        state.y[vars[P_PUL]] = 8.0;
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;

        // Aortic pressure
        system.set(MatrixKind::E, eqns[1], vars[2], self.value(params, param::CPA));
        // Chamber volumes
        system.set(MatrixKind::E, eqns[2], vars[V_RA], 1.0);
        system.set(MatrixKind::E, eqns[5], vars[V_RV], 1.0);
        system.set(MatrixKind::E, eqns[9], vars[V_LA], 1.0);
        system.set(MatrixKind::E, eqns[12], vars[V_LV], 1.0);
        // Chamber outflow inertances
        system.set(MatrixKind::E, eqns[3], vars[Q_RA], self.value(params, param::LRA_V));
        system.set(MatrixKind::E, eqns[6], vars[Q_RV], self.value(params, param::LRV_A));
        system.set(MatrixKind::E, eqns[10], vars[Q_LA], self.value(params, param::LLA_V));
        system.set(MatrixKind::E, eqns[13], vars[Q_LV], self.value(params, param::LLV_A));
        // Pulmonary pressure
        system.set(MatrixKind::E, eqns[7], vars[P_PUL], self.value(params, param::CP));
    }

    fn update_time(&mut self, _system: &mut SparseSystem, params: &ParameterStore, time: f64) {
        self.update_activation(params, time);
    }

    fn update_solution(
        &mut self,
        system: &mut SparseSystem,
        params: &ParameterStore,
        y: &mut DVector<f64>,
        _ydot: &DVector<f64>,
    ) {
        self.update_atrial_psi(params, y);
        self.update_valve_positions(y);

        let vars = self.core.global_var_ids.clone();
        let eqns = self.core.global_eqn_ids.clone();
        let emax_ra = self.value(params, param::EMAX_RA);
        let emax_la = self.value(params, param::EMAX_LA);

        // Eq 0: right atrium pressure from activation and volume
        system.set(MatrixKind::F, eqns[0], vars[0], 1.0);
        system.set(MatrixKind::F, eqns[0], vars[V_RA], -self.aa * emax_ra);
        system.set_c(
            eqns[0],
            self.aa * emax_ra * self.value(params, param::VASO_RA) + self.psi_ra * (self.aa - 1.0),
        );
        system.set(
            MatrixKind::DC,
            eqns[0],
            vars[V_RA],
            self.psi_ra_derivative * (self.aa - 1.0),
        );

        // Eq 1: aortic pressure fed by the LV outflow
        system.set(MatrixKind::F, eqns[1], vars[Q_LV], -self.valves[Q_LV]);
        system.set(MatrixKind::F, eqns[1], vars[3], 1.0);

        // Eq 2: right atrium volume balance
        system.set(MatrixKind::F, eqns[2], vars[Q_RA], self.valves[Q_RA]);
        system.set(MatrixKind::F, eqns[2], vars[1], -1.0);

        // Eq 3: right atrium outflow momentum
        system.set(
            MatrixKind::F,
            eqns[3],
            vars[Q_RA],
            self.value(params, param::RRA_V) * self.valves[Q_RA],
        );
        system.set(MatrixKind::F, eqns[3], vars[0], -1.0);
        system.set(MatrixKind::F, eqns[3], vars[P_RV], 1.0);

        // Eq 4: right ventricle elastance pressure
        system.set(MatrixKind::F, eqns[4], vars[P_RV], 1.0);
        system.set(MatrixKind::F, eqns[4], vars[V_RV], -self.erv);
        system.set_c(eqns[4], self.erv * self.value(params, param::VRV_U));

        // Eq 5: right ventricle volume balance
        system.set(MatrixKind::F, eqns[5], vars[Q_RA], -self.valves[Q_RA]);
        system.set(MatrixKind::F, eqns[5], vars[Q_RV], self.valves[Q_RV]);

        // Eq 6: right ventricle outflow momentum
        system.set(MatrixKind::F, eqns[6], vars[P_RV], -1.0);
        system.set(MatrixKind::F, eqns[6], vars[P_PUL], 1.0);
        system.set(
            MatrixKind::F,
            eqns[6],
            vars[Q_RV],
            self.value(params, param::RRV_A) * self.valves[Q_RV],
        );

        // Eq 7: pulmonary pressure
        let rpd = self.value(params, param::RPD);
        system.set(MatrixKind::F, eqns[7], vars[Q_RV], -self.valves[Q_RV]);
        system.set(MatrixKind::F, eqns[7], vars[P_PUL], 1.0 / rpd);
        system.set(MatrixKind::F, eqns[7], vars[P_LA], -1.0 / rpd);

        // Eq 8: left atrium pressure from activation and volume
        system.set(MatrixKind::F, eqns[8], vars[P_LA], 1.0);
        system.set(MatrixKind::F, eqns[8], vars[V_LA], -self.aa * emax_la);
        system.set_c(
            eqns[8],
            self.aa * emax_la * self.value(params, param::VASO_LA) + self.psi_la * (self.aa - 1.0),
        );
        system.set(
            MatrixKind::DC,
            eqns[8],
            vars[V_LA],
            self.psi_la_derivative * (self.aa - 1.0),
        );

        // Eq 9: left atrium volume balance
        system.set(MatrixKind::F, eqns[9], vars[Q_RV], -self.valves[Q_RV]);
        system.set(MatrixKind::F, eqns[9], vars[Q_LA], self.valves[Q_LA]);

        // Eq 10: left atrium outflow momentum
        system.set(MatrixKind::F, eqns[10], vars[P_LA], -1.0);
        system.set(MatrixKind::F, eqns[10], vars[P_LV], 1.0);
        system.set(
            MatrixKind::F,
            eqns[10],
            vars[Q_LA],
            self.value(params, param::RLA_V) * self.valves[Q_LA],
        );

        // Eq 11: left ventricle elastance pressure
        system.set(MatrixKind::F, eqns[11], vars[P_LV], 1.0);
        system.set(MatrixKind::F, eqns[11], vars[V_LV], -self.elv);
        system.set_c(eqns[11], self.elv * self.value(params, param::VLV_U));

        // Eq 12: left ventricle volume balance
        system.set(MatrixKind::F, eqns[12], vars[Q_LA], -self.valves[Q_LA]);
        system.set(MatrixKind::F, eqns[12], vars[Q_LV], self.valves[Q_LV]);

        // Eq 13: left ventricle outflow momentum
        system.set(MatrixKind::F, eqns[13], vars[P_LV], -1.0);
        system.set(MatrixKind::F, eqns[13], vars[2], 1.0);
        system.set(
            MatrixKind::F,
            eqns[13],
            vars[Q_LV],
            self.value(params, param::RLV_AO) * self.valves[Q_LV],
        );
    }
}

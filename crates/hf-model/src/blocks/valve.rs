//! Diode-like valve with a smooth tanh resistance law.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;
use nalgebra::DVector;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Nonlinear valve resistor.
///
/// The resistance switches smoothly between `Rmin` (forward pressure drop)
/// and `Rmax` (reverse) with steepness `k`:
///
/// ```text
/// P_in − P_out − Rv(ΔP)·Q_in = 0,   Rv = Rmin + (Rmax − Rmin)·½(1 + tanh(−k·ΔP))
/// Q_in − Q_out               = 0
/// ```
///
/// The pressure dependence of `Rv` lands in dC.
pub struct ValveTanh {
    core: BlockCore,
    max_resistance: ParamId,
    min_resistance: ParamId,
    steepness: ParamId,
}

impl ValveTanh {
    pub fn new(
        name: impl Into<String>,
        max_resistance: ParamId,
        min_resistance: ParamId,
        steepness: ParamId,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            max_resistance,
            min_resistance,
            steepness,
        }
    }
}

impl Block for ValveTanh {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::ValveTanh
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 2, &[]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(5, 0, 3)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, _params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        system.set(MatrixKind::F, eqns[0], vars[0], 1.0);
        system.set(MatrixKind::F, eqns[0], vars[2], -1.0);
        system.set(MatrixKind::F, eqns[1], vars[1], 1.0);
        system.set(MatrixKind::F, eqns[1], vars[3], -1.0);
    }

    fn update_solution(
        &mut self,
        system: &mut SparseSystem,
        params: &ParameterStore,
        y: &mut DVector<f64>,
        _ydot: &DVector<f64>,
    ) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let r_max = params.value(self.max_resistance);
        let r_min = params.value(self.min_resistance);
        let k = params.value(self.steepness);

        let dp = y[vars[0]] - y[vars[2]];
        let q_in = y[vars[1]];
        let th = (-k * dp).tanh();
        let rv = r_min + 0.5 * (r_max - r_min) * (1.0 + th);
        // d(Rv)/d(ΔP), with d tanh(−k·x)/dx = −k·(1 − tanh²)
        let drv = -0.5 * (r_max - r_min) * k * (1.0 - th * th);

        system.set(MatrixKind::F, eqns[0], vars[1], -rv);
        system.set(MatrixKind::DC, eqns[0], vars[0], -q_in * drv);
        system.set(MatrixKind::DC, eqns[0], vars[2], q_in * drv);
    }
}

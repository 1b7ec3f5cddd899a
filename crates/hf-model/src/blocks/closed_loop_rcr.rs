//! RCR block with a downstream node, for closed-loop circuits.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// RCR element whose distal side is a real node instead of a fixed
/// pressure, so it can feed a closed loop (e.g. the heart inlet).
///
/// ```text
/// P_in − Rp·Q_in − P_c   = 0
/// Q_in − C·Ṗ_c − Q_out   = 0
/// P_c − Rd·Q_out − P_out = 0
/// ```
pub struct ClosedLoopRcrBc {
    core: BlockCore,
    proximal_resistance: ParamId,
    capacitance: ParamId,
    distal_resistance: ParamId,
    /// Whether this outlet feeds the closed-loop heart inlet
    pub closed_loop_outlet: bool,
}

impl ClosedLoopRcrBc {
    pub fn new(
        name: impl Into<String>,
        proximal_resistance: ParamId,
        capacitance: ParamId,
        distal_resistance: ParamId,
        closed_loop_outlet: bool,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            proximal_resistance,
            capacitance,
            distal_resistance,
            closed_loop_outlet,
        }
    }
}

impl Block for ClosedLoopRcrBc {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::ClosedLoopRcrBc
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 3, &["pressure_c"]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(8, 1, 0)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let (p_in, q_in, p_out, q_out, p_c) = (vars[0], vars[1], vars[2], vars[3], vars[4]);
        let capacitance = if self.core.steady {
            0.0
        } else {
            params.value(self.capacitance)
        };

        system.set(MatrixKind::F, eqns[0], p_in, 1.0);
        system.set(
            MatrixKind::F,
            eqns[0],
            q_in,
            -params.value(self.proximal_resistance),
        );
        system.set(MatrixKind::F, eqns[0], p_c, -1.0);

        system.set(MatrixKind::F, eqns[1], q_in, 1.0);
        system.set(MatrixKind::F, eqns[1], q_out, -1.0);
        system.set(MatrixKind::E, eqns[1], p_c, -capacitance);

        system.set(MatrixKind::F, eqns[2], p_c, 1.0);
        system.set(
            MatrixKind::F,
            eqns[2],
            q_out,
            -params.value(self.distal_resistance),
        );
        system.set(MatrixKind::F, eqns[2], p_out, -1.0);
    }
}

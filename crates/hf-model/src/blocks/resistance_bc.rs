//! Resistance boundary condition with distal pressure.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Resistor against a distal pressure: `P − R(t)·Q − P_d(t) = 0`.
///
/// Both the resistance and the distal pressure may be time curves.
pub struct ResistanceBc {
    core: BlockCore,
    resistance: ParamId,
    distal_pressure: ParamId,
}

impl ResistanceBc {
    pub fn new(name: impl Into<String>, resistance: ParamId, distal_pressure: ParamId) -> Self {
        Self {
            core: BlockCore::new(name),
            resistance,
            distal_pressure,
        }
    }
}

impl Block for ResistanceBc {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::ResistanceBc
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 1, &[]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(2, 0, 0)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, _params: &ParameterStore) {
        system.set(
            MatrixKind::F,
            self.core.global_eqn_ids[0],
            self.core.global_var_ids[0],
            1.0,
        );
    }

    fn update_time(&mut self, system: &mut SparseSystem, params: &ParameterStore, _time: f64) {
        let eqn = self.core.global_eqn_ids[0];
        system.set(
            MatrixKind::F,
            eqn,
            self.core.global_var_ids[1],
            -params.value(self.resistance),
        );
        system.set_c(eqn, -params.value(self.distal_pressure));
    }
}

//! Prescribed-pressure boundary condition.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Applies a prescribed pressure `P = P̂(t)` at its single node.
pub struct PressureReferenceBc {
    core: BlockCore,
    pressure: ParamId,
}

impl PressureReferenceBc {
    pub fn new(name: impl Into<String>, pressure: ParamId) -> Self {
        Self {
            core: BlockCore::new(name),
            pressure,
        }
    }
}

impl Block for PressureReferenceBc {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::PressureBc
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 1, &[]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(1, 0, 0)
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
        system.set_c(self.core.global_eqn_ids[0], -params.value(self.pressure));
    }
}

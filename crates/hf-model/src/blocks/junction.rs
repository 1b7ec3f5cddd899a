//! Mass-conserving junction with pressure continuity.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Junction with arbitrary inlets and outlets.
///
/// All attached pressures are equal and the inflows balance the outflows;
/// with n attached nodes that is n − 1 pressure equalities plus one mass
/// balance, all linear and constant (F only).
pub struct Junction {
    core: BlockCore,
    num_inlets: usize,
    num_outlets: usize,
}

impl Junction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: BlockCore::new(name),
            num_inlets: 0,
            num_outlets: 0,
        }
    }
}

impl Block for Junction {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::Junction
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.num_inlets = self.core.inlet_nodes.len();
        self.num_outlets = self.core.outlet_nodes.len();
        let num_ports = self.num_inlets + self.num_outlets;
        self.core.setup_dofs(dofs, nodes, num_ports, &[]);
    }

    fn num_triplets(&self) -> TripletCounts {
        let num_ports = self.num_inlets + self.num_outlets;
        TripletCounts::new((num_ports - 1) * 2 + num_ports, 0, 0)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, _params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let num_ports = self.num_inlets + self.num_outlets;

        // Pressure continuity against the first inlet
        for i in 0..num_ports - 1 {
            system.set(MatrixKind::F, eqns[i], vars[0], 1.0);
            system.set(MatrixKind::F, eqns[i], vars[2 * i + 2], -1.0);
        }

        // Mass conservation
        let mass_eqn = eqns[num_ports - 1];
        for i in 0..self.num_inlets {
            system.set(MatrixKind::F, mass_eqn, vars[2 * i + 1], 1.0);
        }
        for i in self.num_inlets..num_ports {
            system.set(MatrixKind::F, mass_eqn, vars[2 * i + 1], -1.0);
        }
    }
}

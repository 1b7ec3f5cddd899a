//! Junction with per-port resistances meeting at a common pressure.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Junction whose ports connect through resistances to an internal common
/// pressure `P_c`.
///
/// Rows: one resistance relation per port, plus the mass balance.
///
/// ```text
/// P_i − R_i·Q_i − P_c = 0      (inlet i)
/// P_c − P_j − R_j·Q_j = 0      (outlet j)
/// Σ Q_in − Σ Q_out    = 0
/// ```
pub struct ResistiveJunction {
    core: BlockCore,
    resistances: Vec<ParamId>,
    num_inlets: usize,
    num_outlets: usize,
}

impl ResistiveJunction {
    /// `resistances` holds one parameter per port, inlets first.
    pub fn new(name: impl Into<String>, resistances: Vec<ParamId>) -> Self {
        Self {
            core: BlockCore::new(name),
            resistances,
            num_inlets: 0,
            num_outlets: 0,
        }
    }
}

impl Block for ResistiveJunction {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::ResistiveJunction
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.num_inlets = self.core.inlet_nodes.len();
        self.num_outlets = self.core.outlet_nodes.len();
        let num_ports = self.num_inlets + self.num_outlets;
        assert_eq!(
            self.resistances.len(),
            num_ports,
            "resistive junction {} needs one resistance per port",
            self.core.name
        );
        self.core
            .setup_dofs(dofs, nodes, num_ports + 1, &["pressure_c"]);
    }

    fn num_triplets(&self) -> TripletCounts {
        let num_ports = self.num_inlets + self.num_outlets;
        TripletCounts::new(4 * num_ports, 0, 0)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let num_ports = self.num_inlets + self.num_outlets;
        let p_c = vars[2 * num_ports];

        for i in 0..num_ports {
            let r = params.value(self.resistances[i]);
            let sign = if i < self.num_inlets { 1.0 } else { -1.0 };
            system.set(MatrixKind::F, eqns[i], vars[2 * i], sign);
            system.set(MatrixKind::F, eqns[i], vars[2 * i + 1], -r);
            system.set(MatrixKind::F, eqns[i], p_c, -sign);
        }

        let mass_eqn = eqns[num_ports];
        for i in 0..self.num_inlets {
            system.set(MatrixKind::F, mass_eqn, vars[2 * i + 1], 1.0);
        }
        for i in self.num_inlets..num_ports {
            system.set(MatrixKind::F, mass_eqn, vars[2 * i + 1], -1.0);
        }
    }
}

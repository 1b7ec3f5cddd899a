//! Three-element Windkessel (RCR) boundary condition.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// RCR Windkessel against a distal pressure, with the intermediate
/// pressure `P_c` as an internal variable.
///
/// ```text
/// P − Rp·Q − P_c                      = 0
/// Rd·C·Ṗ_c + P_c − Rd·Q − P_d(t)     = 0
/// ```
///
/// In steady mode the capacitive term is suppressed so the block reduces to
/// a series resistance against `P_d`.
pub struct WindkesselBc {
    core: BlockCore,
    proximal_resistance: ParamId,
    capacitance: ParamId,
    distal_resistance: ParamId,
    distal_pressure: ParamId,
}

impl WindkesselBc {
    pub fn new(
        name: impl Into<String>,
        proximal_resistance: ParamId,
        capacitance: ParamId,
        distal_resistance: ParamId,
        distal_pressure: ParamId,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            proximal_resistance,
            capacitance,
            distal_resistance,
            distal_pressure,
        }
    }
}

impl Block for WindkesselBc {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::WindkesselBc
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 2, &["pressure_c"]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(5, 1, 0)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, _params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        system.set(MatrixKind::F, eqns[0], vars[0], 1.0);
        system.set(MatrixKind::F, eqns[0], vars[2], -1.0);
        system.set(MatrixKind::F, eqns[1], vars[2], 1.0);
    }

    fn update_time(&mut self, system: &mut SparseSystem, params: &ParameterStore, _time: f64) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let rd = params.value(self.distal_resistance);
        let capacitance = if self.core.steady {
            0.0
        } else {
            params.value(self.capacitance)
        };

        system.set(
            MatrixKind::F,
            eqns[0],
            vars[1],
            -params.value(self.proximal_resistance),
        );
        system.set(MatrixKind::E, eqns[1], vars[2], rd * capacitance);
        system.set(MatrixKind::F, eqns[1], vars[1], -rd);
        system.set_c(eqns[1], -params.value(self.distal_pressure));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;
    use hf_core::NodeId;

    fn build() -> (WindkesselBc, ParameterStore, DofHandler) {
        let mut params = ParameterStore::new();
        let rp = params.add(Parameter::constant(100.0));
        let c = params.add(Parameter::constant(1e-4));
        let rd = params.add(Parameter::constant(1000.0));
        let pd = params.add(Parameter::constant(5.0));

        let mut dofs = DofHandler::new();
        let mut node = Node::new(NodeId::from_index(0), "n0");
        node.setup_dofs(&mut dofs);

        let mut bc = WindkesselBc::new("OUT", rp, c, rd, pd);
        bc.core_mut().inlet_nodes.push(NodeId::from_index(0));
        bc.setup_dofs(&mut dofs, &[node], &params);
        (bc, params, dofs)
    }

    #[test]
    fn stamps_rcr_rows() {
        let (mut bc, params, dofs) = build();
        let mut system = SparseSystem::new(dofs.size());
        bc.update_constant(&mut system, &params);
        bc.update_time(&mut system, &params, 0.0);

        let eqns = bc.core().global_eqn_ids.clone();
        let p_c = bc.core().global_var_ids[2];
        assert_eq!(system.coeff(MatrixKind::F, eqns[0], 1), -100.0);
        assert_eq!(system.coeff(MatrixKind::E, eqns[1], p_c), 1000.0 * 1e-4);
        assert_eq!(system.c[eqns[1]], -5.0);
    }

    #[test]
    fn steady_mode_drops_capacitance() {
        let (mut bc, params, dofs) = build();
        bc.to_steady();
        let mut system = SparseSystem::new(dofs.size());
        bc.update_constant(&mut system, &params);
        bc.update_time(&mut system, &params, 0.0);

        let p_c = bc.core().global_var_ids[2];
        assert_eq!(
            system.coeff(MatrixKind::E, bc.core().global_eqn_ids[1], p_c),
            0.0
        );

        bc.to_unsteady();
        bc.update_time(&mut system, &params, 0.0);
        assert_eq!(
            system.coeff(MatrixKind::E, bc.core().global_eqn_ids[1], p_c),
            1000.0 * 1e-4
        );
    }
}

//! Open-loop coronary boundary condition with intramyocardial pressure.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Coronary outlet after Kim et al.: Ra → (Ca) → Ram → (Cim referenced to
/// the intramyocardial pressure Pim(t)) → Rv → venous pressure Pv(t).
///
/// The internal variable is the volume `V_im` stored in the
/// intramyocardial capacitor. Eliminating the interior pressures leaves two
/// rows in `[P, Q, V_im]`:
///
/// ```text
/// Ca·Ram·Ṗ − Ca·Ra·Ram·Q̇ + P − (Ra+Ram)·Q − V_im/Cim − Pim(t) = 0
/// Ram·Rv·V̇_im − Rv·P + Rv·Ra·Q + (Rv+Ram)·V_im/Cim
///     + (Rv+Ram)·Pim(t) − Ram·Pv(t)                            = 0
/// ```
///
/// Steady mode suppresses every E entry, pinning the capacitor volume to
/// its quasi-static value.
pub struct OpenLoopCoronaryBc {
    core: BlockCore,
    ra: ParamId,
    ram: ParamId,
    rv: ParamId,
    ca: ParamId,
    cim: ParamId,
    pim: ParamId,
    pv: ParamId,
}

impl OpenLoopCoronaryBc {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        ra: ParamId,
        ram: ParamId,
        rv: ParamId,
        ca: ParamId,
        cim: ParamId,
        pim: ParamId,
        pv: ParamId,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            ra,
            ram,
            rv,
            ca,
            cim,
            pim,
            pv,
        }
    }
}

impl Block for OpenLoopCoronaryBc {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::OpenLoopCoronaryBc
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], _params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 2, &["volume_im"]);
    }

    fn num_triplets(&self) -> TripletCounts {
        TripletCounts::new(6, 3, 0)
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let eqns = &self.core.global_eqn_ids;
        let (p, q, v_im) = (vars[0], vars[1], vars[2]);
        let ra = params.value(self.ra);
        let ram = params.value(self.ram);
        let rv = params.value(self.rv);
        let ca = params.value(self.ca);
        let cim = params.value(self.cim);

        if self.core.steady {
            system.set(MatrixKind::E, eqns[0], p, 0.0);
            system.set(MatrixKind::E, eqns[0], q, 0.0);
            system.set(MatrixKind::E, eqns[1], v_im, 0.0);
        } else {
            system.set(MatrixKind::E, eqns[0], p, ca * ram);
            system.set(MatrixKind::E, eqns[0], q, -ca * ra * ram);
            system.set(MatrixKind::E, eqns[1], v_im, ram * rv);
        }

        system.set(MatrixKind::F, eqns[0], p, 1.0);
        system.set(MatrixKind::F, eqns[0], q, -(ra + ram));
        system.set(MatrixKind::F, eqns[0], v_im, -1.0 / cim);

        system.set(MatrixKind::F, eqns[1], p, -rv);
        system.set(MatrixKind::F, eqns[1], q, rv * ra);
        system.set(MatrixKind::F, eqns[1], v_im, (rv + ram) / cim);
    }

    fn update_time(&mut self, system: &mut SparseSystem, params: &ParameterStore, _time: f64) {
        let eqns = &self.core.global_eqn_ids;
        let ram = params.value(self.ram);
        let rv = params.value(self.rv);
        let pim = params.value(self.pim);
        let pv = params.value(self.pv);

        system.set_c(eqns[0], -pim);
        system.set_c(eqns[1], (rv + ram) * pim - ram * pv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;
    use hf_core::NodeId;

    #[test]
    fn quiescent_coronary_is_in_equilibrium() {
        // With Pim = Pv = 0, P = Q = V_im = 0 must satisfy both rows.
        let mut params = ParameterStore::new();
        let ids: Vec<ParamId> = [10.0, 20.0, 30.0, 1e-4, 2e-4, 0.0, 0.0]
            .iter()
            .map(|&v| params.add(Parameter::constant(v)))
            .collect();

        let mut dofs = DofHandler::new();
        let mut node = Node::new(NodeId::from_index(0), "n0");
        node.setup_dofs(&mut dofs);

        let mut bc = OpenLoopCoronaryBc::new(
            "COR", ids[0], ids[1], ids[2], ids[3], ids[4], ids[5], ids[6],
        );
        bc.core_mut().inlet_nodes.push(NodeId::from_index(0));
        bc.setup_dofs(&mut dofs, &[node], &params);

        let mut system = SparseSystem::new(dofs.size());
        bc.update_constant(&mut system, &params);
        bc.update_time(&mut system, &params, 0.0);

        let y = nalgebra::DVector::zeros(dofs.size());
        let ydot = nalgebra::DVector::zeros(dofs.size());
        system.update_residual(&y, &ydot);
        for i in bc.core().global_eqn_ids.iter() {
            assert_eq!(system.residual[*i], 0.0);
        }
    }

    #[test]
    fn intramyocardial_pressure_enters_source_vector() {
        let mut params = ParameterStore::new();
        let ra = params.add(Parameter::constant(1.0));
        let ram = params.add(Parameter::constant(2.0));
        let rv = params.add(Parameter::constant(3.0));
        let ca = params.add(Parameter::constant(1.0));
        let cim = params.add(Parameter::constant(1.0));
        let pim = params.add(Parameter::curve(vec![0.0, 1.0], vec![0.0, 10.0], false).unwrap());
        let pv = params.add(Parameter::constant(4.0));

        let mut dofs = DofHandler::new();
        let mut node = Node::new(NodeId::from_index(0), "n0");
        node.setup_dofs(&mut dofs);

        let mut bc = OpenLoopCoronaryBc::new("COR", ra, ram, rv, ca, cim, pim, pv);
        bc.core_mut().inlet_nodes.push(NodeId::from_index(0));
        bc.setup_dofs(&mut dofs, &[node], &params);

        let mut system = SparseSystem::new(dofs.size());
        params.refresh(0.5);
        bc.update_time(&mut system, &params, 0.5);

        let eqns = bc.core().global_eqn_ids.clone();
        assert_eq!(system.c[eqns[0]], -5.0);
        assert_eq!(system.c[eqns[1]], (3.0 + 2.0) * 5.0 - 2.0 * 4.0);
    }
}

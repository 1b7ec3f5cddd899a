//! Junction whose outlets are full blood-vessel segments.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;
use nalgebra::DVector;

use crate::block::{Block, BlockCore, BlockType};
use crate::blocks::vessel::VesselElement;
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// R/C/L/stenosis parameters of one junction branch.
#[derive(Debug, Clone, Copy)]
pub struct BranchParams {
    pub resistance: ParamId,
    pub capacitance: Option<ParamId>,
    pub inductance: Option<ParamId>,
    pub stenosis: Option<ParamId>,
}

/// One inlet, m outlets; every outlet is an internally-owned
/// [`VesselElement`] from the inlet node to that outlet node.
///
/// Each branch carries its own inflow variable `q_i`; the junction itself
/// contributes the single mass balance `Q_in − Σ q_i = 0` tying the shared
/// inlet flow to the branches.
pub struct BloodVesselJunction {
    core: BlockCore,
    branches: Vec<BranchParams>,
    elements: Vec<VesselElement>,
}

impl BloodVesselJunction {
    /// `branches` holds one parameter set per outlet, in outlet order.
    pub fn new(name: impl Into<String>, branches: Vec<BranchParams>) -> Self {
        Self {
            core: BlockCore::new(name),
            branches,
            elements: Vec::new(),
        }
    }
}

impl Block for BloodVesselJunction {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::BloodVesselJunction
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], params: &ParameterStore) {
        let num_outlets = self.core.outlet_nodes.len();
        assert_eq!(
            self.core.inlet_nodes.len(),
            1,
            "blood vessel junction {} supports exactly one inlet",
            self.core.name
        );
        assert_eq!(
            self.branches.len(),
            num_outlets,
            "blood vessel junction {} needs one parameter set per outlet",
            self.core.name
        );

        // One mass-balance row plus a private inflow per branch
        let flow_names: Vec<String> = (0..num_outlets).map(|i| format!("flow_{i}")).collect();
        let flow_refs: Vec<&str> = flow_names.iter().map(String::as_str).collect();
        self.core.setup_dofs(dofs, nodes, 1, &flow_refs);

        let vars = self.core.global_var_ids.clone();
        let p_in = vars[0];
        let flow_base = 2 + 2 * num_outlets;

        self.elements.clear();
        for (i, branch) in self.branches.iter().enumerate() {
            let element = VesselElement::new(
                dofs,
                params,
                &format!("pressure_c_{i}:{}", self.core.name),
                (
                    p_in,
                    vars[flow_base + i],
                    vars[2 + 2 * i],
                    vars[3 + 2 * i],
                ),
                branch.resistance,
                branch.capacitance,
                branch.inductance,
                branch.stenosis,
            );
            if let Some(p_c) = element.midpoint_dof() {
                self.core.global_var_ids.push(p_c);
            }
            self.core.global_eqn_ids.extend_from_slice(element.eqn_ids());
            self.elements.push(element);
        }
    }

    fn num_triplets(&self) -> TripletCounts {
        let mut counts = TripletCounts::new(1 + self.elements.len(), 0, 0);
        for element in &self.elements {
            counts.add(element.num_triplets());
        }
        counts
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let vars = &self.core.global_var_ids;
        let num_outlets = self.elements.len();
        let mass_eqn = self.core.global_eqn_ids[0];
        let flow_base = 2 + 2 * num_outlets;

        system.set(MatrixKind::F, mass_eqn, vars[1], 1.0);
        for i in 0..num_outlets {
            system.set(MatrixKind::F, mass_eqn, vars[flow_base + i], -1.0);
        }
        for element in &self.elements {
            element.update_constant(system, params);
        }
    }

    fn update_solution(
        &mut self,
        system: &mut SparseSystem,
        params: &ParameterStore,
        y: &mut DVector<f64>,
        _ydot: &DVector<f64>,
    ) {
        for element in &self.elements {
            element.update_solution(system, params, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;
    use hf_core::NodeId;

    #[test]
    fn branches_balance_against_shared_inlet_flow() {
        let mut params = ParameterStore::new();
        let r0 = params.add(Parameter::constant(100.0));
        let r1 = params.add(Parameter::constant(200.0));

        let mut dofs = DofHandler::new();
        let mut nodes: Vec<Node> = (0..3)
            .map(|i| Node::new(NodeId::from_index(i), format!("n{i}")))
            .collect();
        for node in &mut nodes {
            node.setup_dofs(&mut dofs);
        }

        let branch = |r| BranchParams {
            resistance: r,
            capacitance: None,
            inductance: None,
            stenosis: None,
        };
        let mut junction = BloodVesselJunction::new("BVJ", vec![branch(r0), branch(r1)]);
        junction.core_mut().inlet_nodes.push(NodeId::from_index(0));
        junction.core_mut().outlet_nodes.push(NodeId::from_index(1));
        junction.core_mut().outlet_nodes.push(NodeId::from_index(2));
        junction.setup_dofs(&mut dofs, &nodes, &params);

        // Own mass row + 2 resistive branches at 2 rows each
        assert_eq!(junction.core().global_eqn_ids.len(), 5);
        // 3 node pairs + 2 private inflows
        assert_eq!(junction.core().global_var_ids.len(), 8);
        // The system stays square: 6 node DOFs + 2 internals vs 5 junction
        // rows; the remaining rows come from whatever attaches to the nodes.
        assert_eq!(dofs.size(), 8);

        let mut system = SparseSystem::new(dofs.size());
        junction.update_constant(&mut system, &params);

        let mass = junction.core().global_eqn_ids[0];
        let q_in = junction.core().global_var_ids[1];
        let q0 = junction.core().global_var_ids[6];
        let q1 = junction.core().global_var_ids[7];
        assert_eq!(system.coeff(MatrixKind::F, mass, q_in), 1.0);
        assert_eq!(system.coeff(MatrixKind::F, mass, q0), -1.0);
        assert_eq!(system.coeff(MatrixKind::F, mass, q1), -1.0);
        assert!(system.nnz(MatrixKind::F) <= junction.num_triplets().f);
    }
}

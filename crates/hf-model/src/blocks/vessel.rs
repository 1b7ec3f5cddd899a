//! Blood vessel element: Poiseuille resistance, capacitance, inductance,
//! and an optional quadratic stenosis pressure drop.

use hf_algebra::sparse::MatrixKind;
use hf_algebra::{SparseSystem, TripletCounts};
use hf_core::ParamId;
use nalgebra::DVector;

use crate::block::{Block, BlockCore, BlockType};
use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// One resistive/capacitive/inductive vessel segment, expressed through the
/// global ids it touches.
///
/// Shared between [`BloodVessel`] and the blood-vessel junction, whose
/// internal branches replace the inlet flow with a private variable.
#[derive(Debug)]
pub(crate) struct VesselElement {
    eqn: Vec<usize>,
    p_in: usize,
    q_in: usize,
    p_out: usize,
    q_out: usize,
    p_c: Option<usize>,
    resistance: ParamId,
    capacitance: Option<ParamId>,
    inductance: Option<ParamId>,
    stenosis: Option<ParamId>,
}

impl VesselElement {
    /// Build an element over already-assigned variable ids, registering its
    /// equation rows (and the midpoint pressure, when capacitive).
    ///
    /// With capacitance the segment carries three rows:
    ///
    /// ```text
    /// P_in − (R + K|Q_in|)·Q_in − P_c        = 0
    /// Q_in − C·Ṗ_c − Q_out                   = 0
    /// P_c − P_out − L·Q̇_out                  = 0
    /// ```
    ///
    /// Without capacitance the midpoint collapses away:
    ///
    /// ```text
    /// P_in − P_out − (R + K|Q_in|)·Q_in − L·Q̇_out = 0
    /// Q_in − Q_out                                 = 0
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        dofs: &mut DofHandler,
        params: &ParameterStore,
        midpoint_name: &str,
        (p_in, q_in, p_out, q_out): (usize, usize, usize, usize),
        resistance: ParamId,
        capacitance: Option<ParamId>,
        inductance: Option<ParamId>,
        stenosis: Option<ParamId>,
    ) -> Self {
        let capacitance = capacitance.filter(|&c| params.value(c) > 0.0);
        let inductance = inductance.filter(|&l| params.value(l) != 0.0);
        let stenosis = stenosis.filter(|&k| params.value(k) != 0.0);

        let p_c = capacitance
            .is_some()
            .then(|| dofs.register_variable(midpoint_name.to_string()));
        let num_equations = if p_c.is_some() { 3 } else { 2 };
        let eqn = (0..num_equations)
            .map(|_| dofs.register_equation())
            .collect();

        Self {
            eqn,
            p_in,
            q_in,
            p_out,
            q_out,
            p_c,
            resistance,
            capacitance,
            inductance,
            stenosis,
        }
    }

    pub(crate) fn num_triplets(&self) -> TripletCounts {
        let inductive = self.inductance.is_some() as usize;
        let stenotic = self.stenosis.is_some() as usize;
        if self.p_c.is_some() {
            TripletCounts::new(7, 1 + inductive, stenotic)
        } else {
            TripletCounts::new(5, inductive, stenotic)
        }
    }

    /// Midpoint pressure variable, if the segment is capacitive.
    pub(crate) fn midpoint_dof(&self) -> Option<usize> {
        self.p_c
    }

    /// Equation rows owned by this segment.
    pub(crate) fn eqn_ids(&self) -> &[usize] {
        &self.eqn
    }

    pub(crate) fn update_constant(&self, system: &mut SparseSystem, params: &ParameterStore) {
        let r = params.value(self.resistance);
        match self.p_c {
            Some(p_c) => {
                let c = params.value(self.capacitance.expect("p_c implies capacitance"));
                system.set(MatrixKind::F, self.eqn[0], self.p_in, 1.0);
                system.set(MatrixKind::F, self.eqn[0], self.q_in, -r);
                system.set(MatrixKind::F, self.eqn[0], p_c, -1.0);

                system.set(MatrixKind::F, self.eqn[1], self.q_in, 1.0);
                system.set(MatrixKind::F, self.eqn[1], self.q_out, -1.0);
                system.set(MatrixKind::E, self.eqn[1], p_c, -c);

                system.set(MatrixKind::F, self.eqn[2], p_c, 1.0);
                system.set(MatrixKind::F, self.eqn[2], self.p_out, -1.0);
                if let Some(l) = self.inductance {
                    system.set(MatrixKind::E, self.eqn[2], self.q_out, -params.value(l));
                }
            }
            None => {
                system.set(MatrixKind::F, self.eqn[0], self.p_in, 1.0);
                system.set(MatrixKind::F, self.eqn[0], self.q_in, -r);
                system.set(MatrixKind::F, self.eqn[0], self.p_out, -1.0);
                if let Some(l) = self.inductance {
                    system.set(MatrixKind::E, self.eqn[0], self.q_out, -params.value(l));
                }

                system.set(MatrixKind::F, self.eqn[1], self.q_in, 1.0);
                system.set(MatrixKind::F, self.eqn[1], self.q_out, -1.0);
            }
        }
    }

    pub(crate) fn update_solution(
        &self,
        system: &mut SparseSystem,
        params: &ParameterStore,
        y: &DVector<f64>,
    ) {
        let Some(k) = self.stenosis else { return };
        // The momentum row carries −(R + K|Q|)·Q; F supplies one factor of
        // K|Q| and dC the second, so the Jacobian sees the full −2K|Q|.
        let fac = -params.value(k) * y[self.q_in].abs();
        let r = params.value(self.resistance);
        system.set(MatrixKind::F, self.eqn[0], self.q_in, fac - r);
        system.set(MatrixKind::DC, self.eqn[0], self.q_in, fac);
    }
}

/// A blood vessel between two nodes.
pub struct BloodVessel {
    core: BlockCore,
    resistance: ParamId,
    capacitance: Option<ParamId>,
    inductance: Option<ParamId>,
    stenosis: Option<ParamId>,
    element: Option<VesselElement>,
}

impl BloodVessel {
    pub fn new(
        name: impl Into<String>,
        resistance: ParamId,
        capacitance: Option<ParamId>,
        inductance: Option<ParamId>,
        stenosis: Option<ParamId>,
    ) -> Self {
        Self {
            core: BlockCore::new(name),
            resistance,
            capacitance,
            inductance,
            stenosis,
            element: None,
        }
    }

    fn element(&self) -> &VesselElement {
        self.element.as_ref().expect("setup_dofs ran")
    }

    /// Midpoint pressure DOF, if the vessel is capacitive.
    pub fn midpoint_dof(&self) -> Option<usize> {
        self.element().midpoint_dof()
    }
}

impl Block for BloodVessel {
    fn core(&self) -> &BlockCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BlockCore {
        &mut self.core
    }

    fn block_type(&self) -> BlockType {
        BlockType::BloodVessel
    }

    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], params: &ParameterStore) {
        self.core.setup_dofs(dofs, nodes, 0, &[]);
        let [p_in, q_in, p_out, q_out] = self.core.global_var_ids[..4]
            .try_into()
            .expect("vessel connects one inlet and one outlet node");

        let element = VesselElement::new(
            dofs,
            params,
            &format!("pressure_c:{}", self.core.name),
            (p_in, q_in, p_out, q_out),
            self.resistance,
            self.capacitance,
            self.inductance,
            self.stenosis,
        );
        if let Some(p_c) = element.midpoint_dof() {
            self.core.global_var_ids.push(p_c);
        }
        self.core.global_eqn_ids = element.eqn_ids().to_vec();
        self.element = Some(element);
    }

    fn num_triplets(&self) -> TripletCounts {
        self.element().num_triplets()
    }

    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        self.element().update_constant(system, params);
    }

    fn update_solution(
        &mut self,
        system: &mut SparseSystem,
        params: &ParameterStore,
        y: &mut DVector<f64>,
        _ydot: &DVector<f64>,
    ) {
        self.element().update_solution(system, params, y);
    }
}

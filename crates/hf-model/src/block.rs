//! The block contract shared by every 0D element.

use hf_algebra::{SparseSystem, State, TripletCounts};
use hf_core::NodeId;
use nalgebra::DVector;

use crate::dofhandler::DofHandler;
use crate::node::Node;
use crate::parameter::ParameterStore;

/// Kind tag for every concrete block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    BloodVessel,
    Junction,
    ResistiveJunction,
    BloodVesselJunction,
    FlowBc,
    PressureBc,
    ResistanceBc,
    WindkesselBc,
    OpenLoopCoronaryBc,
    ClosedLoopRcrBc,
    ClosedLoopHeartPulmonary,
    ValveTanh,
    ChamberElastance,
}

/// State every block carries: its name, node attachments, and the global
/// indices of the variables and equations it touches.
///
/// The variable list is laid out as
/// `[inlet P, inlet Q, outlet P, outlet Q, internals...]`; junction-style
/// blocks generalize to one (P, Q) pair per attached node at positions
/// (2k, 2k+1).
#[derive(Debug, Default)]
pub struct BlockCore {
    pub name: String,
    pub inlet_nodes: Vec<NodeId>,
    pub outlet_nodes: Vec<NodeId>,
    pub global_var_ids: Vec<usize>,
    pub global_eqn_ids: Vec<usize>,
    pub steady: bool,
}

impl BlockCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Request equation rows and internal variables from the DOF handler and
    /// record the global ids this block touches.
    pub fn setup_dofs(
        &mut self,
        dofs: &mut DofHandler,
        nodes: &[Node],
        num_equations: usize,
        internal_vars: &[&str],
    ) {
        self.global_var_ids.clear();
        for node_id in self.inlet_nodes.iter().chain(&self.outlet_nodes) {
            let node = &nodes[node_id.index() as usize];
            self.global_var_ids.push(node.pres_dof);
            self.global_var_ids.push(node.flow_dof);
        }
        for var in internal_vars {
            self.global_var_ids
                .push(dofs.register_variable(format!("{var}:{}", self.name)));
        }

        self.global_eqn_ids.clear();
        for _ in 0..num_equations {
            self.global_eqn_ids.push(dofs.register_equation());
        }
    }

    /// Number of attached nodes.
    pub fn num_nodes(&self) -> usize {
        self.inlet_nodes.len() + self.outlet_nodes.len()
    }
}

/// A lumped 0D element contributing rows to the global DAE.
///
/// Hooks are split by what can change: `update_constant` runs once per mode
/// switch, `update_time` once per time step, `update_solution` once per
/// Newton iteration. Blocks without a hook inherit the empty default.
pub trait Block {
    fn core(&self) -> &BlockCore;

    fn core_mut(&mut self) -> &mut BlockCore;

    fn block_type(&self) -> BlockType;

    /// Register equations and internal variables with the DOF handler.
    ///
    /// Parameter values are available for decisions that shape the DOF
    /// layout (a vessel without capacitance owns no internal pressure).
    fn setup_dofs(&mut self, dofs: &mut DofHandler, nodes: &[Node], params: &ParameterStore);

    /// Nonzero contributions to (F, E, dE+dF+dC), for sparse reservation.
    fn num_triplets(&self) -> TripletCounts;

    /// Stamp entries that depend only on constant parameters.
    fn update_constant(&mut self, system: &mut SparseSystem, params: &ParameterStore) {
        let _ = (system, params);
    }

    /// Stamp entries that depend on time-varying parameters at `time`.
    fn update_time(&mut self, system: &mut SparseSystem, params: &ParameterStore, time: f64) {
        let _ = (system, params, time);
    }

    /// Stamp entries that depend on the current Newton iterate.
    fn update_solution(
        &mut self,
        system: &mut SparseSystem,
        params: &ParameterStore,
        y: &mut DVector<f64>,
        ydot: &DVector<f64>,
    ) {
        let _ = (system, params, y, ydot);
    }

    /// Receive model-wide values resolved at finalize time.
    fn set_model_dependent_params(&mut self, cardiac_cycle_period: f64) {
        let _ = cardiac_cycle_period;
    }

    /// Write block-specific fixed initial conditions into the state.
    fn set_initial_condition(&self, state: &mut State) {
        let _ = state;
    }

    /// Switch the block to steady behavior.
    fn to_steady(&mut self) {
        self.core_mut().steady = true;
    }

    /// Restore unsteady behavior.
    fn to_unsteady(&mut self) {
        self.core_mut().steady = false;
    }

    fn name(&self) -> &str {
        &self.core().name
    }
}

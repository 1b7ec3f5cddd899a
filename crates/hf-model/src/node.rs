//! Connection nodes between blocks.

use hf_core::NodeId;

use crate::dofhandler::DofHandler;

/// A physical connection point between blocks.
///
/// Every node owns exactly two degrees of freedom, its pressure and its
/// flow; both appear in the variable lists of all incident blocks.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Global index of the pressure DOF (assigned at finalize)
    pub pres_dof: usize,
    /// Global index of the flow DOF (assigned at finalize)
    pub flow_dof: usize,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pres_dof: usize::MAX,
            flow_dof: usize::MAX,
        }
    }

    /// Register the pressure and flow DOFs of this node.
    pub fn setup_dofs(&mut self, dofs: &mut DofHandler) {
        self.pres_dof = dofs.register_variable(format!("pressure:{}", self.name));
        self.flow_dof = dofs.register_variable(format!("flow:{}", self.name));
    }
}

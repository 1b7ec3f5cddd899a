//! The assembled 0D model.

use std::collections::HashMap;

use hf_algebra::{DaeModel, SparseSystem, State, TripletCounts};
use hf_core::{BlockId, NodeId, ParamId};
use nalgebra::DVector;

use crate::block::{Block, BlockType};
use crate::dofhandler::DofHandler;
use crate::error::{ModelError, ModelResult};
use crate::node::Node;
use crate::parameter::{Parameter, ParameterStore};

/// A complete 0D model: blocks, nodes, parameters and the DOF handler.
///
/// Built incrementally by the configuration loader (or by hand in tests),
/// then frozen with [`Model::finalize`]. After finalize the topology is
/// fixed and the model acts as the assembly backend for the integrator.
pub struct Model {
    pub dofhandler: DofHandler,
    /// Cardiac cycle period; negative until defined by a parameter or the
    /// heart block, defaulted to 1.0 at finalize.
    pub cardiac_cycle_period: f64,
    /// Simulation time of the latest time update
    pub time: f64,
    blocks: Vec<Box<dyn Block>>,
    block_index: HashMap<String, usize>,
    nodes: Vec<Node>,
    parameters: ParameterStore,
    finalized: bool,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("dofhandler", &self.dofhandler)
            .field("cardiac_cycle_period", &self.cardiac_cycle_period)
            .field("time", &self.time)
            .field("blocks", &self.blocks.len())
            .field("block_index", &self.block_index)
            .field("nodes", &self.nodes)
            .field("parameters", &self.parameters)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            dofhandler: DofHandler::new(),
            cardiac_cycle_period: -1.0,
            time: 0.0,
            blocks: Vec::new(),
            block_index: HashMap::new(),
            nodes: Vec::new(),
            parameters: ParameterStore::new(),
            finalized: false,
        }
    }

    /// Add a constant parameter.
    pub fn add_parameter(&mut self, value: f64) -> ParamId {
        self.parameters.add(Parameter::constant(value))
    }

    /// Add a time-dependent parameter.
    ///
    /// A periodic curve defines the model's cardiac cycle period; every
    /// periodic parameter must agree on it.
    pub fn add_parameter_curve(
        &mut self,
        times: Vec<f64>,
        values: Vec<f64>,
        periodic: bool,
    ) -> ModelResult<ParamId> {
        let param = Parameter::curve(times, values, periodic)?;
        if let Some(period) = param.cycle_period() {
            if self.cardiac_cycle_period > 0.0 && period != self.cardiac_cycle_period {
                return Err(ModelError::InconsistentCyclePeriod {
                    expected: self.cardiac_cycle_period,
                    found: period,
                });
            }
            self.cardiac_cycle_period = period;
        }
        Ok(self.parameters.add(param))
    }

    /// Access the parameter table.
    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    /// Add a block, returning its stable id.
    pub fn add_block(&mut self, block: Box<dyn Block>) -> ModelResult<BlockId> {
        if self.finalized {
            return Err(ModelError::Finalized {
                what: "cannot add blocks",
            });
        }
        let name = block.name().to_string();
        if self.block_index.contains_key(&name) {
            return Err(ModelError::DuplicateBlock { name });
        }
        let id = BlockId::from_index(self.blocks.len() as u32);
        self.block_index.insert(name, self.blocks.len());
        self.blocks.push(block);
        Ok(id)
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Block by id.
    pub fn block(&self, id: BlockId) -> &dyn Block {
        self.blocks[id.index() as usize].as_ref()
    }

    /// Block id by name.
    pub fn block_id(&self, name: &str) -> ModelResult<BlockId> {
        self.block_index
            .get(name)
            .map(|&i| BlockId::from_index(i as u32))
            .ok_or_else(|| ModelError::UnknownBlock {
                name: name.to_string(),
            })
    }

    /// Block by name.
    pub fn get_block(&self, name: &str) -> ModelResult<&dyn Block> {
        Ok(self.block(self.block_id(name)?))
    }

    /// Block type by name.
    pub fn get_block_type(&self, name: &str) -> ModelResult<BlockType> {
        Ok(self.get_block(name)?.block_type())
    }

    /// Whether any block of the given type is present.
    pub fn has_block_type(&self, block_type: BlockType) -> bool {
        self.blocks.iter().any(|b| b.block_type() == block_type)
    }

    /// Iterate over all blocks.
    pub fn blocks(&self) -> impl Iterator<Item = &dyn Block> {
        self.blocks.iter().map(|b| b.as_ref())
    }

    /// Create a node joining the outlets of `inlet_blocks` to the inlets of
    /// `outlet_blocks`.
    pub fn add_node(
        &mut self,
        inlet_blocks: &[BlockId],
        outlet_blocks: &[BlockId],
        name: impl Into<String>,
    ) -> ModelResult<NodeId> {
        if self.finalized {
            return Err(ModelError::Finalized {
                what: "cannot add nodes",
            });
        }
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, name));
        for &block in inlet_blocks {
            self.blocks[block.index() as usize]
                .core_mut()
                .outlet_nodes
                .push(id);
        }
        for &block in outlet_blocks {
            self.blocks[block.index() as usize]
                .core_mut()
                .inlet_nodes
                .push(id);
        }
        Ok(id)
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index() as usize]
    }

    /// All nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Assign DOFs, resolve model-dependent parameters, and freeze the
    /// topology. The resulting system must be square.
    pub fn finalize(&mut self) -> ModelResult<()> {
        if self.finalized {
            return Err(ModelError::Finalized {
                what: "finalize ran twice",
            });
        }

        for node in &mut self.nodes {
            node.setup_dofs(&mut self.dofhandler);
        }
        for block in &mut self.blocks {
            block.setup_dofs(&mut self.dofhandler, &self.nodes, &self.parameters);
        }

        if self.cardiac_cycle_period < 0.0 {
            self.cardiac_cycle_period = 1.0;
        }
        for block in &mut self.blocks {
            block.set_model_dependent_params(self.cardiac_cycle_period);
        }

        let variables = self.dofhandler.size();
        let equations = self.dofhandler.num_equations();
        if variables != equations {
            return Err(ModelError::NotSquare {
                variables,
                equations,
            });
        }

        self.parameters.refresh(0.0);
        self.finalized = true;
        log::debug!(
            "finalized model: {} blocks, {} nodes, {} unknowns",
            self.blocks.len(),
            self.nodes.len(),
            variables
        );
        Ok(())
    }

    /// Number of global DOFs.
    pub fn num_dofs(&self) -> usize {
        self.dofhandler.size()
    }

    /// Aggregate triplet counts over all blocks.
    pub fn get_num_triplets(&self) -> TripletCounts {
        let mut counts = TripletCounts::default();
        for block in &self.blocks {
            counts.add(block.num_triplets());
        }
        counts
    }

    /// Apply block-defined fixed initial conditions.
    pub fn set_block_initial_conditions(&self, state: &mut State) {
        for block in &self.blocks {
            block.set_initial_condition(state);
        }
    }

    /// Switch parameters and blocks to steady behavior.
    pub fn to_steady(&mut self) {
        self.parameters.to_steady();
        for block in &mut self.blocks {
            block.to_steady();
        }
    }

    /// Restore unsteady behavior.
    pub fn to_unsteady(&mut self) {
        self.parameters.to_unsteady();
        for block in &mut self.blocks {
            block.to_unsteady();
        }
    }
}

impl DaeModel for Model {
    fn update_constant(&mut self, system: &mut SparseSystem) {
        let Self {
            blocks, parameters, ..
        } = self;
        for block in blocks {
            block.update_constant(system, parameters);
        }
    }

    fn update_time(&mut self, system: &mut SparseSystem, time: f64) {
        self.time = time;
        self.parameters.refresh(time);
        let Self {
            blocks, parameters, ..
        } = self;
        for block in blocks {
            block.update_time(system, parameters, time);
        }
    }

    fn update_solution(
        &mut self,
        system: &mut SparseSystem,
        y: &mut DVector<f64>,
        ydot: &DVector<f64>,
    ) {
        let Self {
            blocks, parameters, ..
        } = self;
        for block in blocks {
            block.update_solution(system, parameters, y, ydot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BloodVessel, FlowReferenceBc, PressureReferenceBc};

    /// Flow BC → resistor vessel → pressure BC.
    fn simple_chain() -> Model {
        let mut model = Model::new();
        let q = model.add_parameter(1.0);
        let r = model.add_parameter(100.0);
        let p = model.add_parameter(0.0);

        let inflow = model
            .add_block(Box::new(FlowReferenceBc::new("INFLOW", q)))
            .unwrap();
        let vessel = model
            .add_block(Box::new(BloodVessel::new("V0", r, None, None, None)))
            .unwrap();
        let outlet = model
            .add_block(Box::new(PressureReferenceBc::new("OUT", p)))
            .unwrap();

        model.add_node(&[inflow], &[vessel], "INFLOW:V0").unwrap();
        model.add_node(&[vessel], &[outlet], "V0:OUT").unwrap();
        model
    }

    #[test]
    fn finalize_produces_square_system() {
        let mut model = simple_chain();
        model.finalize().unwrap();
        assert_eq!(model.num_dofs(), 4);
        assert_eq!(model.dofhandler.num_equations(), 4);
    }

    #[test]
    fn var_ids_stay_in_range() {
        let mut model = simple_chain();
        model.finalize().unwrap();
        let n = model.num_dofs();
        for block in model.blocks() {
            for &var in &block.core().global_var_ids {
                assert!(var < n);
            }
            for &eqn in &block.core().global_eqn_ids {
                assert!(eqn < n);
            }
        }
    }

    #[test]
    fn triplet_counts_bound_stamped_nonzeros() {
        use hf_algebra::MatrixKind;

        let mut model = simple_chain();
        model.finalize().unwrap();
        let counts = model.get_num_triplets();

        let mut system = SparseSystem::new(model.num_dofs());
        model.update_constant(&mut system);
        model.update_time(&mut system, 0.0);
        let mut y = DVector::zeros(model.num_dofs());
        let ydot = DVector::zeros(model.num_dofs());
        model.update_solution(&mut system, &mut y, &ydot);

        assert!(system.nnz(MatrixKind::F) <= counts.f);
        assert!(system.nnz(MatrixKind::E) <= counts.e);
        let d = system.nnz(MatrixKind::DE) + system.nnz(MatrixKind::DF) + system.nnz(MatrixKind::DC);
        assert!(d <= counts.d);
    }

    #[test]
    fn duplicate_block_names_rejected() {
        let mut model = Model::new();
        let q = model.add_parameter(1.0);
        model
            .add_block(Box::new(FlowReferenceBc::new("B", q)))
            .unwrap();
        let err = model
            .add_block(Box::new(FlowReferenceBc::new("B", q)))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateBlock { .. }));
    }

    #[test]
    fn periodic_parameters_must_share_cycle_period() {
        let mut model = Model::new();
        model
            .add_parameter_curve(vec![0.0, 0.5, 1.0], vec![0.0, 1.0, 0.0], true)
            .unwrap();
        assert_eq!(model.cardiac_cycle_period, 1.0);
        let err = model
            .add_parameter_curve(vec![0.0, 0.4, 0.8], vec![0.0, 1.0, 0.0], true)
            .unwrap_err();
        assert!(matches!(err, ModelError::InconsistentCyclePeriod { .. }));
    }

    #[test]
    fn steady_round_trip_restores_parameters() {
        let mut model = Model::new();
        let id = model
            .add_parameter_curve(vec![0.0, 0.5, 1.0], vec![1.0, 3.0, 2.0], true)
            .unwrap();
        let before: Vec<f64> = (0..3).map(|i| model.parameters().get(id).get(i as f64 * 0.5)).collect();

        model.to_steady();
        assert_eq!(model.parameters().get(id).get(0.25), 2.0);
        model.to_unsteady();

        let after: Vec<f64> = (0..3).map(|i| model.parameters().get(id).get(i as f64 * 0.5)).collect();
        assert_eq!(before, after);
    }
}

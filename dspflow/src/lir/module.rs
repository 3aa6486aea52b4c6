//! Built modules.

use std::rc::Rc;

use linked_hash_map::LinkedHashMap;

use super::*;
use crate::value::*;

/// Module's inner data.
#[derive(Debug)]
pub struct ModuleInner {
    /// Name of module.
    pub name: String,

    /// Node arena.
    pub graph: Graph,

    /// Input ports in declaration order.
    pub inputs: LinkedHashMap<String, NodeId>,

    /// Output ports in declaration order.
    pub outputs: LinkedHashMap<String, NodeId>,

    /// Evaluation order of every node.
    pub schedule: Vec<NodeId>,
}

/// Module: an immutable, scheduled dataflow graph with named ports.
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) inner: Rc<ModuleInner>,
}

impl Module {
    pub(crate) fn new(inner: ModuleInner) -> Self { Self { inner: Rc::new(inner) } }

    /// Returns module name.
    pub fn name(&self) -> &str { &self.inner.name }

    /// Returns the node arena.
    pub fn graph(&self) -> &Graph { &self.inner.graph }

    /// Returns input ports.
    pub fn inputs(&self) -> &LinkedHashMap<String, NodeId> { &self.inner.inputs }

    /// Returns output ports.
    pub fn outputs(&self) -> &LinkedHashMap<String, NodeId> { &self.inner.outputs }

    /// Returns the evaluation order.
    pub fn schedule(&self) -> &[NodeId] { &self.inner.schedule }

    /// Returns the type of an input port.
    pub fn input_typ(&self, port: &str) -> Option<&ValueTyp> {
        self.inner.inputs.get(port).map(|id| self.graph().typ(*id))
    }

    /// Returns the type of an output port.
    pub fn output_typ(&self, port: &str) -> Option<&ValueTyp> {
        self.inner.outputs.get(port).map(|id| self.graph().typ(*id))
    }

    /// Number of nodes that keep state across ticks.
    pub fn num_stateful(&self) -> usize { self.graph().iter().filter(|(_, node)| node.kind.is_stateful()).count() }
}

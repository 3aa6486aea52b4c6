//! Composite module context.

use linked_hash_map::LinkedHashMap;
use tracing::debug;

use super::*;
use crate::lir::*;
use crate::num::*;
use crate::signal::Signal;
use crate::sim::SimError;
use crate::value::*;

/// Default input port name of single-input modules.
pub const DIN: &str = "din";

/// Default output port name of single-output modules.
pub const DOUT: &str = "dout";

/// Composite module context used while building a module.
#[derive(Debug)]
pub struct CompositeModuleContext {
    name: String,
    graph: Graph,
    inputs: LinkedHashMap<String, NodeId>,
    outputs: LinkedHashMap<String, NodeId>,
}

/// Creates a new composite module by running `f` on a fresh context.
///
/// ### Example
/// ```
/// # use dspflow::*;
/// let module = composite("double", |k| {
///     let din = k.input(DIN, ValueTyp::Num(FixpType::int(8)))?;
///     let dout = din.add(k, din)?;
///     k.output(DOUT, dout)
/// })
/// .unwrap();
/// assert_eq!(module.output_typ(DOUT), Some(&ValueTyp::Num(FixpType::int(9))));
/// ```
pub fn composite<F: FnOnce(&mut CompositeModuleContext) -> Result<(), GraphError>>(
    name: &str, f: F,
) -> Result<Module, GraphError> {
    let mut k = CompositeModuleContext::new(name);
    f(&mut k)?;
    k.build()
}

impl CompositeModuleContext {
    /// Creates an empty context.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            graph: Graph::default(),
            inputs: LinkedHashMap::new(),
            outputs: LinkedHashMap::new(),
        }
    }

    /// Module name.
    pub fn name(&self) -> &str { &self.name }

    /// Adds a node.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<Stream, GraphError> { self.graph.add(kind).map(Stream::new) }

    /// Returns the node arena built so far.
    pub fn graph(&self) -> &Graph { &self.graph }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph { &mut self.graph }

    /// Declares an input port.
    pub fn input(&mut self, name: &str, typ: ValueTyp) -> Result<Stream, GraphError> {
        if self.inputs.contains_key(name) {
            return Err(GraphError::DuplicatePort(name.to_string()));
        }
        let stream = self.add_node(NodeKind::Input { name: name.to_string(), typ })?;
        let _ = self.inputs.insert(name.to_string(), stream.id());
        Ok(stream)
    }

    /// Declares an output port.
    pub fn output(&mut self, name: &str, stream: Stream) -> Result<(), GraphError> {
        if self.outputs.contains_key(name) {
            return Err(GraphError::DuplicatePort(name.to_string()));
        }
        let _ = self.outputs.insert(name.to_string(), stream.id());
        Ok(())
    }

    /// Constant stream, valid on every tick.
    pub fn constant(&mut self, value: Value) -> Result<Stream, GraphError> { self.add_node(NodeKind::Const { value }) }

    /// Constant number from a float literal.
    pub fn constant_f64(&mut self, typ: FixpType, value: f64) -> Result<Stream, GraphError> {
        self.constant(Value::Num(Fixp::from_f64(typ, value)?))
    }

    /// Feedback placeholder of the given type, to be connected later with [`Feedback::connect`].
    pub fn feedback(&mut self, typ: ValueTyp) -> Result<(Stream, Feedback), GraphError> {
        let stream = self.add_node(NodeKind::Forward { source: None, typ })?;
        Ok((stream, Feedback::new(stream.id())))
    }

    /// Tuple of the given streams.
    pub fn concat(&mut self, streams: &[Stream]) -> Result<Stream, GraphError> {
        self.add_node(NodeKind::Concat { inputs: streams.iter().map(|s| s.id()).collect() })
    }

    /// Array of the given same-typed streams.
    pub fn pack(&mut self, streams: &[Stream]) -> Result<Stream, GraphError> {
        self.add_node(NodeKind::Pack { inputs: streams.iter().map(|s| s.id()).collect() })
    }

    /// Queue element of `data` with end-of-transfer bits `eot`, innermost first.
    pub fn queue(&mut self, data: Stream, eot: &[Stream]) -> Result<Stream, GraphError> {
        self.add_node(NodeKind::Queue { data: data.id(), eot: eot.iter().map(|s| s.id()).collect() })
    }

    /// Selects `inputs[select]`.
    pub fn mux(&mut self, select: Stream, inputs: &[Stream]) -> Result<Stream, GraphError> {
        self.add_node(NodeKind::Mux { select: select.id(), inputs: inputs.iter().map(|s| s.id()).collect() })
    }

    /// Combinational closure, evaluated on ticks where every input carries data.
    pub fn map<F: 'static + Fn(&[Value]) -> Result<Value, SimError>>(
        &mut self, inputs: &[Stream], typ: ValueTyp, f: F,
    ) -> Result<Stream, GraphError> {
        self.add_node(NodeKind::Map { inputs: inputs.iter().map(|s| s.id()).collect(), typ, f: MapFn::new(f) })
    }

    /// Mealy state machine with typed state.
    ///
    /// On every tick `f` receives the inputs (`None` where there is no data) and the current state, and returns the
    /// output (`None` for no data) and the next state.
    pub fn fsm<S, F>(&mut self, inputs: &[Stream], typ: ValueTyp, init: S, f: F) -> Result<Stream, GraphError>
    where
        S: 'static + Signal,
        F: 'static + Fn(&[Option<Value>], S) -> Result<(Option<Value>, S), SimError>,
    {
        let f = FsmFn::new(move |inputs: &[Option<Value>], state: Value| -> FsmResult {
            let (output, next) = f(inputs, S::from_value(state)?)?;
            Ok((output, next.into_value()))
        });
        let inputs = inputs.iter().map(|s| s.id()).collect();
        self.add_node(NodeKind::Fsm { inputs, typ, init: init.into_value(), f })
    }

    /// Schedules the graph and freezes it into a module.
    pub fn build(self) -> Result<Module, GraphError> {
        let schedule = self.graph.schedule()?;
        let module = Module::new(ModuleInner {
            name: self.name,
            graph: self.graph,
            inputs: self.inputs,
            outputs: self.outputs,
            schedule,
        });
        debug!(
            module = module.name(),
            nodes = module.graph().len(),
            stateful = module.num_stateful(),
            inputs = module.inputs().len(),
            outputs = module.outputs().len(),
            "built module"
        );
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ports_are_rejected() {
        let res = composite("dup", |k| {
            let _ = k.input(DIN, ValueTyp::Bool)?;
            let _ = k.input(DIN, ValueTyp::Bool)?;
            Ok(())
        });
        assert!(matches!(res, Err(GraphError::DuplicatePort(name)) if name == DIN));
    }

    #[test]
    fn unconnected_feedback_is_rejected() {
        let res = composite("open_loop", |k| {
            let (fb, _feedback) = k.feedback(ValueTyp::Bool)?;
            k.output(DOUT, fb)
        });
        assert!(matches!(res, Err(GraphError::UnconnectedFeedback(_))));
    }

    #[test]
    fn literal_out_of_range_fails_construction() {
        let res = composite("const", |k| {
            let c = k.constant_f64(FixpType::fixp(1, 14), 1.5)?;
            k.output(DOUT, c)
        });
        assert!(matches!(res, Err(GraphError::Fixp(FixpError::OutOfRange { .. }))));
    }
}

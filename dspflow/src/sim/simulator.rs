//! Simulator.

use std::collections::VecDeque;

use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use tracing::{debug, trace, warn};

use super::SimError;
use crate::lir::*;
use crate::some_or;
use crate::value::*;

/// State of a node.
#[derive(Debug, Clone)]
enum State {
    Stateless,
    Register(Option<Value>),
    Buffer(VecDeque<Value>),
    Fsm(Value),
}

impl State {
    fn initial(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Register { init, .. } => Self::Register(init.clone()),
            NodeKind::Decouple { init, .. } => Self::Buffer(init.iter().cloned().collect()),
            NodeKind::Fsm { init, .. } => Self::Fsm(init.clone()),
            _ => Self::Stateless,
        }
    }
}

#[derive(Debug, Default)]
struct Collector {
    values: Vec<Value>,
    expected: Option<usize>,
}

impl Collector {
    fn satisfied(&self) -> bool { self.expected.map_or(true, |expected| self.values.len() >= expected) }
}

/// Single-clock simulator of a [`Module`].
///
/// Every tick evaluates the nodes in schedule order, harvests the output ports, and then latches registers,
/// buffers and FSM states.
#[derive(Debug)]
pub struct Simulator {
    module: Module,
    values: Vec<Option<Value>>,
    states: Vec<State>,
    next_states: Vec<Option<Value>>,
    drivers: LinkedHashMap<String, VecDeque<Value>>,
    collectors: LinkedHashMap<String, Collector>,
    tick: usize,
}

impl Simulator {
    /// Creates a simulator in the initial state.
    pub fn new(module: &Module) -> Self {
        let len = module.graph().len();
        Self {
            module: module.clone(),
            values: vec![None; len],
            states: module.graph().iter().map(|(_, node)| State::initial(&node.kind)).collect(),
            next_states: vec![None; len],
            drivers: LinkedHashMap::new(),
            collectors: LinkedHashMap::new(),
            tick: 0,
        }
    }

    /// Simulated module.
    pub fn module(&self) -> &Module { &self.module }

    /// Number of ticks since creation or the last reset.
    pub fn ticks(&self) -> usize { self.tick }

    /// Restores the initial state, drops pending inputs and clears collected outputs.
    pub fn reset(&mut self) {
        for (id, node) in self.module.graph().iter() {
            self.states[id.0] = State::initial(&node.kind);
        }
        self.values.iter_mut().for_each(|value| *value = None);
        self.next_states.iter_mut().for_each(|value| *value = None);
        self.drivers.clear();
        self.collectors.iter_mut().for_each(|(_, collector)| collector.values.clear());
        self.tick = 0;
    }

    fn input_typ(&self, port: &str) -> Result<&ValueTyp, SimError> {
        self.module.input_typ(port).ok_or_else(|| SimError::NoSuchPort(port.to_string()))
    }

    /// Queues `values` on an input port, one per tick.
    pub fn drive<I: IntoIterator<Item = Value>>(&mut self, port: &str, values: I) -> Result<(), SimError> {
        let typ = self.input_typ(port)?.clone();
        let values = values.into_iter().collect_vec();
        for value in &values {
            value.check(&typ).map_err(|source| SimError::TypMismatch { at: format!("port '{}'", port), source })?;
        }
        self.drivers.entry(port.to_string()).or_insert_with(VecDeque::new).extend(values);
        Ok(())
    }

    /// Queues float literals on a numeric input port, converting them to the port's type.
    pub fn drive_f64<I: IntoIterator<Item = f64>>(&mut self, port: &str, values: I) -> Result<(), SimError> {
        let typ = self.input_typ(port)?.num()?;
        let values = values.into_iter().map(|value| Value::from_f64(typ, value)).collect::<Result<Vec<_>, _>>()?;
        self.drive(port, values)
    }

    /// Collects every valid value of an output port. `run` stops once `expected` values have arrived.
    pub fn collect(&mut self, port: &str, expected: Option<usize>) -> Result<(), SimError> {
        if !self.module.outputs().contains_key(port) {
            return Err(SimError::NoSuchPort(port.to_string()));
        }
        let _ = self.collectors.insert(port.to_string(), Collector { values: vec![], expected });
        Ok(())
    }

    /// Values collected so far.
    pub fn collected(&self, port: &str) -> Result<&[Value], SimError> {
        let collector = some_or!(self.collectors.get(port), return Err(SimError::NoSuchPort(port.to_string())));
        Ok(&collector.values)
    }

    /// Numeric values collected so far, as floats.
    pub fn collected_f64(&self, port: &str) -> Result<Vec<f64>, SimError> {
        Ok(self.collected(port)?.iter().map(Value::to_f64).collect::<Result<_, _>>()?)
    }

    /// Numeric values collected so far, as integers (rounded toward negative infinity).
    pub fn collected_i128(&self, port: &str) -> Result<Vec<i128>, SimError> {
        Ok(self.collected(port)?.iter().map(|value| value.as_num().map(|n| n.to_int())).collect::<Result<_, _>>()?)
    }

    /// Runs one tick with explicit inputs and returns this tick's outputs. Unlisted inputs carry no data.
    pub fn step(&mut self, inputs: &[(&str, Value)]) -> Result<LinkedHashMap<String, Option<Value>>, SimError> {
        let mut port_values = LinkedHashMap::new();
        for (port, value) in inputs {
            let typ = self.input_typ(port)?;
            value.check(typ).map_err(|source| SimError::TypMismatch { at: format!("port '{}'", port), source })?;
            let _ = port_values.insert(self.module.inputs()[*port], value.clone());
        }
        let _ = self.tick_once(port_values)?;
        Ok(self.module.outputs().iter().map(|(port, id)| (port.clone(), self.values[id.0].clone())).collect())
    }

    /// Runs until `timeout` ticks have passed, or the drivers are exhausted and either every collector with an
    /// expected count is satisfied or (without expectations) no output has been produced for longer than the
    /// graph is deep.
    ///
    /// Returns the number of ticks run.
    pub fn run(&mut self, timeout: usize) -> Result<usize, SimError> {
        let start = self.tick;
        let expecting = self.collectors.values().any(|collector| collector.expected.is_some());
        debug!(module = self.module.name(), timeout, expecting, "simulation start");

        let mut quiet = 0;
        while self.tick - start < timeout {
            let drained = self.drivers.values().all(VecDeque::is_empty);
            if drained {
                if expecting {
                    if self.collectors.values().all(Collector::satisfied) {
                        break;
                    }
                } else if quiet > self.module.graph().len() {
                    break;
                }
            }

            let inputs = self.next_inputs();
            let produced = self.tick_once(inputs)?;
            quiet = if drained && !produced { quiet + 1 } else { 0 };
        }

        let ticks = self.tick - start;
        if !self.collectors.values().all(Collector::satisfied) {
            warn!(module = self.module.name(), ticks, "simulation timed out before collecting every expected value");
        }
        debug!(module = self.module.name(), ticks, "simulation stop");
        Ok(ticks)
    }

    fn next_inputs(&mut self) -> LinkedHashMap<NodeId, Value> {
        let mut port_values = LinkedHashMap::new();
        for (port, queue) in self.drivers.iter_mut() {
            if let Some(value) = queue.pop_front() {
                let _ = port_values.insert(self.module.inputs()[port], value);
            }
        }
        port_values
    }

    /// Evaluates, harvests and latches. Returns whether any output port carried data.
    fn tick_once(&mut self, port_values: LinkedHashMap<NodeId, Value>) -> Result<bool, SimError> {
        self.evaluate(port_values)?;

        let mut produced = false;
        for (port, id) in self.module.outputs() {
            if let Some(value) = &self.values[id.0] {
                produced = true;
                if let Some(collector) = self.collectors.get_mut(port) {
                    collector.values.push(value.clone());
                }
            }
        }
        trace!(tick = self.tick, produced, "tick");

        self.commit()?;
        self.tick += 1;
        Ok(produced)
    }

    fn evaluate(&mut self, mut port_values: LinkedHashMap<NodeId, Value>) -> Result<(), SimError> {
        let module = self.module.clone();
        for &id in module.schedule() {
            let node = module.graph().node(id);
            let value = match &node.kind {
                NodeKind::Input { .. } => port_values.remove(&id),
                NodeKind::Const { value } => Some(value.clone()),
                NodeKind::Forward { source, .. } => source.and_then(|source| self.values[source.0].clone()),
                NodeKind::Register { .. } => match &self.states[id.0] {
                    State::Register(value) => value.clone(),
                    _ => None,
                },
                NodeKind::Decouple { .. } => match &self.states[id.0] {
                    State::Buffer(queue) => queue.front().cloned(),
                    _ => None,
                },
                NodeKind::Mux { select, inputs } => match &self.values[select.0] {
                    None => None,
                    Some(select) => {
                        let index = match select {
                            Value::Bool(b) => i128::from(*b),
                            value => value.as_num()?.to_int(),
                        };
                        let input = usize::try_from(index).ok().and_then(|index| inputs.get(index));
                        let input = some_or!(
                            input,
                            return Err(SimError::SelectOutOfRange { node: id, select: index, len: inputs.len() })
                        );
                        self.values[input.0].clone()
                    }
                },
                NodeKind::When { input, cond } => match self.values[cond.0] {
                    Some(Value::Bool(true)) => self.values[input.0].clone(),
                    _ => None,
                },
                NodeKind::Fsm { inputs, f, .. } => {
                    let args = inputs.iter().map(|input| self.values[input.0].clone()).collect_vec();
                    let state = match &self.states[id.0] {
                        State::Fsm(state) => state.clone(),
                        _ => Value::Tuple(vec![]),
                    };
                    let (output, next) = f.call(&args, state)?;
                    self.next_states[id.0] = Some(next);
                    self.checked(id, node, output)?
                }
                kind => {
                    let args =
                        kind.inputs().iter().map(|input| self.values[input.0].clone()).collect::<Option<Vec<_>>>();
                    match args {
                        None => None,
                        Some(args) if matches!(kind, NodeKind::Map { .. }) => {
                            self.checked(id, node, Some(apply(kind, &args)?))?
                        }
                        Some(args) => Some(apply(kind, &args)?),
                    }
                }
            };
            self.values[id.0] = value;
        }
        Ok(())
    }

    /// Type-checks values produced by user closures.
    fn checked(&self, id: NodeId, node: &Node, value: Option<Value>) -> Result<Option<Value>, SimError> {
        if let Some(value) = &value {
            value
                .check(&node.typ)
                .map_err(|source| SimError::TypMismatch { at: format!("{} {}", node.kind.name(), id), source })?;
        }
        Ok(value)
    }

    fn commit(&mut self) -> Result<(), SimError> {
        let module = self.module.clone();
        for (id, node) in module.graph().iter() {
            match (&node.kind, &mut self.states[id.0]) {
                (NodeKind::Register { input, init }, State::Register(value)) => {
                    // State registers keep their value through idle ticks, pipeline registers forward bubbles.
                    if init.is_none() || self.values[input.0].is_some() {
                        *value = self.values[input.0].clone();
                    }
                }
                (NodeKind::Decouple { input, ready, depth, .. }, State::Buffer(queue)) => {
                    let ready = match ready {
                        None => true,
                        Some(ready) => matches!(self.values[ready.0], Some(Value::Bool(true))),
                    };
                    if ready {
                        let _ = queue.pop_front();
                    }
                    if let Some(value) = &self.values[input.0] {
                        if queue.len() >= *depth {
                            return Err(SimError::BufferOverrun { node: id, depth: *depth, tick: self.tick });
                        }
                        queue.push_back(value.clone());
                    }
                }
                (NodeKind::Fsm { .. }, State::Fsm(state)) => {
                    if let Some(next) = self.next_states[id.0].take() {
                        *state = next;
                    }
                }
                _ => (),
            }
        }
        Ok(())
    }
}

/// Evaluates a combinational node whose inputs all carry data.
fn apply(kind: &NodeKind, args: &[Value]) -> Result<Value, SimError> {
    let value = match kind {
        NodeKind::Unary { op, .. } => {
            let x = args[0].as_num()?;
            match op {
                UnaryOp::Neg => Value::Num(x.checked_neg()?),
                UnaryOp::IsNeg => Value::Bool(x.is_neg()),
                UnaryOp::Round(frac_bits) => Value::Num(x.round(*frac_bits)?),
            }
        }
        NodeKind::Binary { op, .. } => {
            let (lhs, rhs) = (args[0].as_num()?, args[1].as_num()?);
            Value::Num(match op {
                BinaryOp::Add => lhs.checked_add(rhs)?,
                BinaryOp::Sub => lhs.checked_sub(rhs)?,
                BinaryOp::Mul => lhs.checked_mul(rhs)?,
            })
        }
        NodeKind::Quantize { target, quantization, overflow, .. } => {
            Value::Num(args[0].as_num()?.quantize(*target, *quantization, *overflow))
        }
        NodeKind::Concat { .. } => Value::Tuple(args.to_vec()),
        NodeKind::Pack { .. } => Value::Array(args.to_vec()),
        NodeKind::Field { index, .. } => args[0].field(*index)?,
        NodeKind::Queue { .. } => {
            let eot = args[1..].iter().map(Value::as_bool).collect::<Result<Eot, _>>()?;
            Value::Queue(Box::new(args[0].clone()), eot)
        }
        NodeKind::Map { f, .. } => f.call(args)?,
        kind => unreachable!("{} is not a combinational operator", kind.name()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::*;
    use crate::lir::GraphError;
    use crate::num::*;

    const T: FixpType = FixpType::int(8);

    fn int(x: i128) -> Value { Value::Num(Fixp::from_int(T, x).unwrap()) }

    fn reg_module(init: Option<Value>) -> Module {
        composite("reg", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            let dout = din.reg(k, init)?;
            k.output(DOUT, dout)
        })
        .unwrap()
    }

    #[test]
    fn state_register_holds_through_idle_ticks() {
        let mut sim = Simulator::new(&reg_module(Some(int(-1))));
        assert_eq!(sim.step(&[(DIN, int(5))]).unwrap()[DOUT], Some(int(-1)));
        assert_eq!(sim.step(&[(DIN, int(6))]).unwrap()[DOUT], Some(int(5)));
        assert_eq!(sim.step(&[]).unwrap()[DOUT], Some(int(6)));
        assert_eq!(sim.step(&[]).unwrap()[DOUT], Some(int(6)));
        assert_eq!(sim.step(&[(DIN, int(7))]).unwrap()[DOUT], Some(int(6)));
        assert_eq!(sim.step(&[]).unwrap()[DOUT], Some(int(7)));
    }

    #[test]
    fn pipeline_register_delays_bubbles() {
        let mut sim = Simulator::new(&reg_module(None));
        assert_eq!(sim.step(&[(DIN, int(5))]).unwrap()[DOUT], None);
        assert_eq!(sim.step(&[]).unwrap()[DOUT], Some(int(5)));
        assert_eq!(sim.step(&[(DIN, int(6))]).unwrap()[DOUT], None);
        assert_eq!(sim.step(&[]).unwrap()[DOUT], Some(int(6)));
        assert_eq!(sim.step(&[]).unwrap()[DOUT], None);
    }

    #[test]
    fn buffer_overrun_is_an_error() {
        let module = composite("stall", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            let never = k.constant(Value::Bool(false))?;
            let buf = din.decouple(k, 2, vec![])?;
            buf.set_ready(k, never)?;
            k.output(DOUT, buf.output())
        })
        .unwrap();
        let mut sim = Simulator::new(&module);
        sim.drive(DIN, (0..3).map(int)).unwrap();
        assert!(matches!(sim.run(10), Err(SimError::BufferOverrun { depth: 2, tick: 2, .. })));
    }

    #[test]
    fn accumulator_with_feedback() -> Result<(), GraphError> {
        let module = composite("acc", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            let (acc, feedback) = k.feedback(ValueTyp::Num(T))?;
            let sum = din.add(k, acc)?.trunc(k, T)?;
            let next = sum.reg_zero(k)?;
            feedback.connect(k, next)?;
            k.output(DOUT, sum)
        })?;
        let mut sim = Simulator::new(&module);
        sim.drive(DIN, (1..=4).map(int)).unwrap();
        sim.collect(DOUT, Some(4)).unwrap();
        let _ = sim.run(100).unwrap();
        assert_eq!(sim.collected_i128(DOUT).unwrap(), vec![1, 3, 6, 10]);

        sim.reset();
        sim.drive(DIN, (1..=4).map(int)).unwrap();
        let _ = sim.run(100).unwrap();
        assert_eq!(sim.collected_i128(DOUT).unwrap(), vec![1, 3, 6, 10]);
        Ok(())
    }

    #[test]
    fn mux_selector_out_of_range() {
        let module = composite("mux", |k| {
            let sel = k.input("sel", ValueTyp::Num(FixpType::uint(2)))?;
            let a = k.constant(int(1))?;
            let b = k.constant(int(2))?;
            let dout = k.mux(sel, &[a, b])?;
            k.output(DOUT, dout)
        })
        .unwrap();
        let mut sim = Simulator::new(&module);
        let sel = |x| Value::Num(Fixp::from_int(FixpType::uint(2), x).unwrap());
        assert_eq!(sim.step(&[("sel", sel(1))]).unwrap()[DOUT], Some(int(2)));
        assert!(matches!(sim.step(&[("sel", sel(3))]), Err(SimError::SelectOutOfRange { select: 3, len: 2, .. })));
    }

    #[test]
    fn unknown_port_and_wrong_type() {
        let module = composite("id", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            k.output(DOUT, din)
        })
        .unwrap();
        let mut sim = Simulator::new(&module);
        assert!(matches!(sim.drive("x", vec![]), Err(SimError::NoSuchPort(_))));
        assert!(matches!(sim.drive(DIN, vec![Value::Bool(true)]), Err(SimError::TypMismatch { .. })));
        assert!(sim.drive_f64(DIN, vec![1000.0]).is_err());
    }
}

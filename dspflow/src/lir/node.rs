//! Dataflow nodes.

use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use super::GraphError;
use crate::num::*;
use crate::sim::SimError;
use crate::value::*;

/// Node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the index into the arena.
    pub fn index(self) -> usize { self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Combinational closure.
#[derive(Clone)]
pub struct MapFn(Rc<dyn Fn(&[Value]) -> Result<Value, SimError>>);

impl MapFn {
    /// Wraps a closure.
    pub fn new<F: 'static + Fn(&[Value]) -> Result<Value, SimError>>(f: F) -> Self { Self(Rc::new(f)) }

    /// Calls the closure.
    pub fn call(&self, inputs: &[Value]) -> Result<Value, SimError> { (self.0)(inputs) }
}

impl fmt::Debug for MapFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("MapFn") }
}

/// Output (if any) and next state of an FSM.
pub type FsmResult = Result<(Option<Value>, Value), SimError>;

/// Mealy state machine closure: `(inputs, state) -> (output, next state)`.
#[derive(Clone)]
pub struct FsmFn(Rc<dyn Fn(&[Option<Value>], Value) -> FsmResult>);

impl FsmFn {
    /// Wraps a closure.
    pub fn new<F: 'static + Fn(&[Option<Value>], Value) -> FsmResult>(f: F) -> Self { Self(Rc::new(f)) }

    /// Calls the closure.
    pub fn call(&self, inputs: &[Option<Value>], state: Value) -> FsmResult { (self.0)(inputs, state) }
}

impl fmt::Debug for FsmFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("FsmFn") }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Exact negation
    Neg,

    /// Sign test
    IsNeg,

    /// Round half up to the given number of fractional bits
    Round(u32),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Exact addition
    Add,

    /// Exact subtraction
    Sub,

    /// Exact multiplication
    Mul,
}

/// Node kinds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Input port.
    Input {
        /// Port name
        name: String,

        /// Port type
        typ: ValueTyp,
    },

    /// Constant, valid on every tick.
    Const {
        /// Value
        value: Value,
    },

    /// Feedback placeholder, forwards its source once connected.
    Forward {
        /// Source node
        source: Option<NodeId>,

        /// Declared type
        typ: ValueTyp,
    },

    /// Unary operation.
    Unary {
        /// Operator
        op: UnaryOp,

        /// Operand
        input: NodeId,
    },

    /// Binary operation.
    Binary {
        /// Operator
        op: BinaryOp,

        /// Left operand
        lhs: NodeId,

        /// Right operand
        rhs: NodeId,
    },

    /// Conversion to a narrower (or wider) fixed-point type.
    Quantize {
        /// Operand
        input: NodeId,

        /// Target type
        target: FixpType,

        /// Quantization policy
        quantization: Quantization,

        /// Overflow policy
        overflow: Overflow,
    },

    /// Tuple construction.
    Concat {
        /// Fields
        inputs: Vec<NodeId>,
    },

    /// Array construction.
    Pack {
        /// Elements
        inputs: Vec<NodeId>,
    },

    /// Projection of a tuple, array or queue field.
    Field {
        /// Aggregate
        input: NodeId,

        /// Field index
        index: usize,
    },

    /// Queue element construction.
    Queue {
        /// Data
        data: NodeId,

        /// End-of-transfer bits, innermost first
        eot: Vec<NodeId>,
    },

    /// Selection among same-typed inputs.
    Mux {
        /// Selector (`Bool` or unsigned integer)
        select: NodeId,

        /// Candidates
        inputs: Vec<NodeId>,
    },

    /// Combinational closure over valid inputs.
    Map {
        /// Operands
        inputs: Vec<NodeId>,

        /// Output type
        typ: ValueTyp,

        /// Closure
        f: MapFn,
    },

    /// Passes the input on ticks where the condition is `true`.
    When {
        /// Gated stream
        input: NodeId,

        /// Condition
        cond: NodeId,
    },

    /// Mealy state machine.
    Fsm {
        /// Operands, possibly without data
        inputs: Vec<NodeId>,

        /// Output type
        typ: ValueTyp,

        /// Initial state
        init: Value,

        /// Transition closure
        f: FsmFn,
    },

    /// Clocked register.
    Register {
        /// Sampled input
        input: NodeId,

        /// Output on the first tick, `None` for no data
        init: Option<Value>,
    },

    /// Bounded FIFO.
    Decouple {
        /// Sampled input
        input: NodeId,

        /// Consumer ready, always ready if absent
        ready: Option<NodeId>,

        /// Capacity
        depth: usize,

        /// Initial contents, front first
        init: Vec<Value>,
    },
}

impl NodeKind {
    /// Returns every input of the node.
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Self::Input { .. } | Self::Const { .. } => vec![],
            Self::Forward { source, .. } => source.iter().copied().collect(),
            Self::Unary { input, .. }
            | Self::Quantize { input, .. }
            | Self::Field { input, .. }
            | Self::Register { input, .. } => vec![*input],
            Self::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Self::Concat { inputs } | Self::Pack { inputs } | Self::Map { inputs, .. } | Self::Fsm { inputs, .. } => {
                inputs.clone()
            }
            Self::Queue { data, eot } => [vec![*data], eot.clone()].concat(),
            Self::Mux { select, inputs } => [vec![*select], inputs.clone()].concat(),
            Self::When { input, cond } => vec![*input, *cond],
            Self::Decouple { input, ready, .. } => [vec![*input], ready.iter().copied().collect()].concat(),
        }
    }

    /// Returns the inputs the node's output depends on within the same tick.
    ///
    /// Registers and buffers sample their inputs at the tick boundary.
    pub fn comb_inputs(&self) -> Vec<NodeId> {
        match self {
            Self::Register { .. } | Self::Decouple { .. } => vec![],
            _ => self.inputs(),
        }
    }

    /// Does the node keep state across ticks?
    pub fn is_stateful(&self) -> bool {
        matches!(self, Self::Register { .. } | Self::Decouple { .. } | Self::Fsm { .. })
    }

    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Const { .. } => "const",
            Self::Forward { .. } => "forward",
            Self::Unary { .. } => "unary",
            Self::Binary { .. } => "binary",
            Self::Quantize { .. } => "quantize",
            Self::Concat { .. } => "concat",
            Self::Pack { .. } => "pack",
            Self::Field { .. } => "field",
            Self::Queue { .. } => "queue",
            Self::Mux { .. } => "mux",
            Self::Map { .. } => "map",
            Self::When { .. } => "when",
            Self::Fsm { .. } => "fsm",
            Self::Register { .. } => "register",
            Self::Decouple { .. } => "decouple",
        }
    }
}

/// Node: kind and inferred output type.
#[derive(Debug, Clone)]
pub struct Node {
    /// Kind.
    pub kind: NodeKind,

    /// Output type.
    pub typ: ValueTyp,
}

fn num(at: &str, typ: &ValueTyp) -> Result<FixpType, GraphError> {
    match typ {
        ValueTyp::Num(typ) => Ok(*typ),
        _ => Err(GraphError::mismatch(at, "a number", typ)),
    }
}

fn same<'a>(at: &str, typs: &'a [ValueTyp]) -> Result<&'a ValueTyp, GraphError> {
    let first = typs.first().ok_or_else(|| GraphError::InvalidConfig(format!("{} needs at least one input", at)))?;
    match typs.iter().find(|typ| *typ != first) {
        Some(other) => Err(GraphError::mismatch(at, first, other)),
        None => Ok(first),
    }
}

/// Infers the output type of a node from the types of its inputs.
pub fn infer(kind: &NodeKind, typ_of: impl Fn(NodeId) -> ValueTyp) -> Result<ValueTyp, GraphError> {
    let at = kind.name();
    let typ = match kind {
        NodeKind::Input { typ, .. } | NodeKind::Forward { typ, .. } | NodeKind::Map { typ, .. } => typ.clone(),
        NodeKind::Const { value } => value_typ(value)?,
        NodeKind::Unary { op, input } => {
            let typ = num(at, &typ_of(*input))?;
            match op {
                UnaryOp::Neg => ValueTyp::Num(typ.neg_typ()?),
                UnaryOp::IsNeg => ValueTyp::Bool,
                UnaryOp::Round(frac_bits) => ValueTyp::Num(typ.round_typ(*frac_bits)?),
            }
        }
        NodeKind::Binary { op, lhs, rhs } => {
            let (lhs, rhs) = (num(at, &typ_of(*lhs))?, num(at, &typ_of(*rhs))?);
            ValueTyp::Num(match op {
                BinaryOp::Add => lhs.add_typ(rhs)?,
                BinaryOp::Sub => lhs.sub_typ(rhs)?,
                BinaryOp::Mul => lhs.mul_typ(rhs)?,
            })
        }
        NodeKind::Quantize { input, target, .. } => {
            num(at, &typ_of(*input))?;
            ValueTyp::Num(*target)
        }
        NodeKind::Concat { inputs } => ValueTyp::Tuple(inputs.iter().map(|id| typ_of(*id)).collect()),
        NodeKind::Pack { inputs } => {
            let typs = inputs.iter().map(|id| typ_of(*id)).collect_vec();
            ValueTyp::array(same(at, &typs)?.clone(), typs.len())
        }
        NodeKind::Field { input, index } => typ_of(*input).field(*index)?,
        NodeKind::Queue { data, eot } => {
            if let Some(typ) = eot.iter().map(|id| typ_of(*id)).find(|typ| *typ != ValueTyp::Bool) {
                return Err(GraphError::mismatch(at, ValueTyp::Bool, typ));
            }
            ValueTyp::queue(typ_of(*data), eot.len())?
        }
        NodeKind::Mux { select, inputs } => {
            match typ_of(*select) {
                ValueTyp::Bool => (),
                ValueTyp::Num(typ) if !typ.signed() && typ.is_integer() => (),
                typ => return Err(GraphError::mismatch(at, "Bool or an unsigned integer", typ)),
            }
            let typs = inputs.iter().map(|id| typ_of(*id)).collect_vec();
            same(at, &typs)?.clone()
        }
        NodeKind::When { input, cond } => {
            let cond = typ_of(*cond);
            if cond != ValueTyp::Bool {
                return Err(GraphError::mismatch(at, ValueTyp::Bool, cond));
            }
            typ_of(*input)
        }
        NodeKind::Fsm { typ, .. } => typ.clone(),
        NodeKind::Register { input, init } => {
            let typ = typ_of(*input);
            if let Some(init) = init {
                init.check(&typ)?;
            }
            typ
        }
        NodeKind::Decouple { input, ready, depth, init } => {
            let typ = typ_of(*input);
            for value in init {
                value.check(&typ)?;
            }
            if let Some(ready) = ready {
                let ready = typ_of(*ready);
                if ready != ValueTyp::Bool {
                    return Err(GraphError::mismatch("decouple ready", ValueTyp::Bool, ready));
                }
            }
            if *depth == 0 || init.len() > *depth {
                return Err(GraphError::InvalidConfig(format!(
                    "decouple depth {} cannot hold {} initial values",
                    depth,
                    init.len()
                )));
            }
            typ
        }
    };
    Ok(typ)
}

/// Type of a constant. Arrays must be non-empty and homogeneous.
pub fn value_typ(value: &Value) -> Result<ValueTyp, GraphError> {
    Ok(match value {
        Value::Bool(_) => ValueTyp::Bool,
        Value::Num(n) => ValueTyp::Num(n.typ()),
        Value::Tuple(values) => ValueTyp::Tuple(values.iter().map(value_typ).collect::<Result<_, _>>()?),
        Value::Array(values) => {
            let typs = values.iter().map(value_typ).collect::<Result<Vec<_>, _>>()?;
            ValueTyp::array(same("constant array", &typs)?.clone(), typs.len())
        }
        Value::Queue(data, eot) => ValueTyp::queue(value_typ(data)?, eot.len())?,
    })
}

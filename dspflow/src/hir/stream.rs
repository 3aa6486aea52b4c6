//! Streams.

use super::*;
use crate::lir::*;
use crate::num::*;
use crate::utils::*;
use crate::value::*;

/// Handle of a node's output inside a [`CompositeModuleContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stream {
    id: NodeId,
}

impl Stream {
    pub(crate) fn new(id: NodeId) -> Self { Self { id } }

    /// Node id.
    pub fn id(self) -> NodeId { self.id }

    /// Output type.
    pub fn typ(self, k: &CompositeModuleContext) -> ValueTyp { k.graph().typ(self.id).clone() }

    /// Fixed-point type of a numeric stream.
    pub fn num_typ(self, k: &CompositeModuleContext) -> Result<FixpType, GraphError> {
        match k.graph().typ(self.id) {
            ValueTyp::Num(typ) => Ok(*typ),
            typ => Err(GraphError::mismatch(self.id, "a number", typ)),
        }
    }

    fn unary(self, k: &mut CompositeModuleContext, op: UnaryOp) -> Result<Stream, GraphError> {
        k.add_node(NodeKind::Unary { op, input: self.id })
    }

    fn binary(self, k: &mut CompositeModuleContext, op: BinaryOp, rhs: Stream) -> Result<Stream, GraphError> {
        k.add_node(NodeKind::Binary { op, lhs: self.id, rhs: rhs.id })
    }

    /// Exact addition.
    pub fn add(self, k: &mut CompositeModuleContext, rhs: Stream) -> Result<Stream, GraphError> {
        self.binary(k, BinaryOp::Add, rhs)
    }

    /// Exact subtraction.
    pub fn sub(self, k: &mut CompositeModuleContext, rhs: Stream) -> Result<Stream, GraphError> {
        self.binary(k, BinaryOp::Sub, rhs)
    }

    /// Exact multiplication.
    pub fn mul(self, k: &mut CompositeModuleContext, rhs: Stream) -> Result<Stream, GraphError> {
        self.binary(k, BinaryOp::Mul, rhs)
    }

    /// Exact multiplication by a constant.
    pub fn mul_const(self, k: &mut CompositeModuleContext, value: Fixp) -> Result<Stream, GraphError> {
        let c = k.constant(Value::Num(value))?;
        self.mul(k, c)
    }

    /// Exact addition of a constant.
    pub fn add_const(self, k: &mut CompositeModuleContext, value: Fixp) -> Result<Stream, GraphError> {
        let c = k.constant(Value::Num(value))?;
        self.add(k, c)
    }

    /// Exact negation.
    pub fn neg(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError> { self.unary(k, UnaryOp::Neg) }

    /// `true` if negative.
    pub fn is_neg(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError> { self.unary(k, UnaryOp::IsNeg) }

    /// Rounds half up to `frac_bits` fractional bits, keeping an extra integer bit for the carry.
    pub fn qround(self, k: &mut CompositeModuleContext, frac_bits: u32) -> Result<Stream, GraphError> {
        self.unary(k, UnaryOp::Round(frac_bits))
    }

    /// Converts to `target` with the given policies.
    pub fn quantize(
        self, k: &mut CompositeModuleContext, target: FixpType, quantization: Quantization, overflow: Overflow,
    ) -> Result<Stream, GraphError> {
        k.add_node(NodeKind::Quantize { input: self.id, target, quantization, overflow })
    }

    /// Truncates to `target`, wrapping on overflow.
    pub fn trunc(self, k: &mut CompositeModuleContext, target: FixpType) -> Result<Stream, GraphError> {
        self.quantize(k, target, Quantization::Truncate, Overflow::WrapAround)
    }

    /// Truncates to `target`, saturating on overflow.
    pub fn saturate(self, k: &mut CompositeModuleContext, target: FixpType) -> Result<Stream, GraphError> {
        self.quantize(k, target, Quantization::Truncate, Overflow::Saturate)
    }

    /// `true` on ticks where the stream carries data.
    pub fn valid(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError> {
        k.map(&[self], ValueTyp::Bool, |_| Ok(Value::Bool(true)))
    }

    /// Passes data only on ticks where `cond` is `true`.
    pub fn when(self, k: &mut CompositeModuleContext, cond: Stream) -> Result<Stream, GraphError> {
        k.add_node(NodeKind::When { input: self.id, cond: cond.id() })
    }

    /// Adds a register. The first tick outputs `init`.
    ///
    /// With an `init` value the register holds state: it keeps its value on ticks where the input carries no
    /// data. Without one it is a pipeline stage that delays bubbles like any other value.
    pub fn reg(self, k: &mut CompositeModuleContext, init: Option<Value>) -> Result<Stream, GraphError> {
        k.add_node(NodeKind::Register { input: self.id, init })
    }

    /// Adds a register that starts at zero.
    pub fn reg_zero(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError> {
        let zero = Value::zero(&self.typ(k));
        self.reg(k, Some(zero))
    }

    /// Adds `n` registers without initial data.
    pub fn pipeline(self, k: &mut CompositeModuleContext, n: usize) -> Result<Stream, GraphError> {
        (0..n).try_fold(self, |stream, _| stream.reg(k, None))
    }

    /// Adds a buffer of at least `depth` entries (rounded up to a power of two), pre-loaded with `init`.
    ///
    /// The buffer is always ready until [`Decoupled::set_ready`] is called.
    pub fn decouple(
        self, k: &mut CompositeModuleContext, depth: usize, init: Vec<Value>,
    ) -> Result<Decoupled, GraphError> {
        let depth = ceil_pow2(depth.max(init.len()).max(1));
        let node = k.add_node(NodeKind::Decouple { input: self.id, ready: None, depth, init })?;
        Ok(Decoupled::new(node.id()))
    }

    /// Projects a tuple, array or queue field.
    pub fn field(self, k: &mut CompositeModuleContext, index: usize) -> Result<Stream, GraphError> {
        k.add_node(NodeKind::Field { input: self.id, index })
    }

    /// Data of a queue element.
    pub fn queue_data(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError> { self.field(k, 0) }

    /// End-of-transfer bit of level `lvl` of a queue element.
    pub fn queue_eot(self, k: &mut CompositeModuleContext, lvl: usize) -> Result<Stream, GraphError> {
        self.field(k, 1 + lvl)
    }

    /// Splits a tuple or an array into its fields.
    pub fn split(self, k: &mut CompositeModuleContext) -> Result<Vec<Stream>, GraphError> {
        let len = match self.typ(k) {
            ValueTyp::Tuple(typs) => typs.len(),
            ValueTyp::Array(_, len) => len,
            typ => return Err(GraphError::mismatch(self.id, "a tuple or an array", typ)),
        };
        (0..len).map(|i| self.field(k, i)).collect()
    }
}

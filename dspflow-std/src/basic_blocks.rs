//! Arithmetic blocks with explicit quantization, overflow handling and latency.

use serde::{Deserialize, Serialize};

use crate::*;

/// Output format and latency of an arithmetic block.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DspConfig {
    /// Output type, the exact result type if `None`
    pub t: Option<ValueTyp>,

    /// Reduction of the fractional part
    pub quantization: Quantization,

    /// Reduction of the integer part
    pub overflow: Overflow,

    /// Number of registers between the inputs and the output
    pub latency: usize,
}

impl DspConfig {
    /// Exact result delayed by `latency` ticks.
    pub fn with_latency(latency: usize) -> Self { Self { latency, ..Self::default() } }

    /// Numeric target type. Any other target is rejected.
    fn target(&self) -> Result<Option<FixpType>, GraphError> {
        match &self.t {
            None => Ok(None),
            Some(ValueTyp::Num(t)) => Ok(Some(*t)),
            Some(t) => Err(GraphError::InvalidTarget(t.to_string())),
        }
    }

    /// Formats an exact result. A third of the latency is spent before quantization, the rest after.
    fn format(&self, k: &mut CompositeModuleContext, res: Stream) -> Result<Stream, GraphError> {
        let target = self.target()?;
        let pre = self.latency / 3;

        let res = res.pipeline(k, pre)?;
        let res = match target {
            None => res,
            // Integer targets only differ in the overflow policy.
            Some(t) if t.is_integer() => res.quantize(k, t, Quantization::Truncate, self.overflow)?,
            Some(t) => res.quantize(k, t, self.quantization, self.overflow)?,
        };
        res.pipeline(k, self.latency - pre)
    }
}

/// Arithmetic blocks on a pair of operands.
pub trait DspExt {
    /// Product of the operands.
    fn mult_dsp(self, k: &mut CompositeModuleContext, config: &DspConfig) -> Result<Stream, GraphError>;

    /// Sum (or difference, the first operand being the minuend) of the operands.
    fn add_sub_dsp(
        self, k: &mut CompositeModuleContext, operation: Operation, config: &DspConfig,
    ) -> Result<Stream, GraphError>;
}

impl DspExt for (Stream, Stream) {
    fn mult_dsp(self, k: &mut CompositeModuleContext, config: &DspConfig) -> Result<Stream, GraphError> {
        let (a, b) = self;
        let prod = a.mul(k, b)?;
        config.format(k, prod)
    }

    fn add_sub_dsp(
        self, k: &mut CompositeModuleContext, operation: Operation, config: &DspConfig,
    ) -> Result<Stream, GraphError> {
        let (a, b) = self;
        let res = match operation {
            Operation::Add => a.add(k, b)?,
            Operation::Sub => a.sub(k, b)?,
        };
        config.format(k, res)
    }
}

/// Output formatting extension.
pub trait FormatFixpExt {
    /// Rounds half up to the fractional bits of `t`, then saturates to `t`.
    fn format_fixp(self, k: &mut CompositeModuleContext, t: FixpType) -> Result<Stream, GraphError>;
}

impl FormatFixpExt for Stream {
    fn format_fixp(self, k: &mut CompositeModuleContext, t: FixpType) -> Result<Stream, GraphError> {
        self.qround(k, t.frac_bits())?.saturate(k, t)
    }
}

/// Selection extension.
pub trait MuxDspExt {
    /// Propagates `din[self]`.
    fn mux_dsp(self, k: &mut CompositeModuleContext, din: &[Stream]) -> Result<Stream, GraphError>;
}

impl MuxDspExt for Stream {
    fn mux_dsp(self, k: &mut CompositeModuleContext, din: &[Stream]) -> Result<Stream, GraphError> {
        k.mux(self, din)
    }
}

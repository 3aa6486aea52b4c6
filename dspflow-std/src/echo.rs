//! Echo audio effect.

use serde::{Deserialize, Serialize};

use crate::*;

/// Echo extension.
pub trait EchoExt {
    /// Adds an echo delayed by `delay` samples to a continuous sample stream:
    /// `y[n] = x[n] + gain * y[n - delay]`, both products truncated to the sample type.
    fn echo(self, k: &mut CompositeModuleContext, feedback_gain: f64, delay: usize) -> Result<Stream, GraphError>;

    /// Applies [`EchoExt::echo`] to both channels of a `(left, right)` sample stream.
    fn stereo_echo(
        self, k: &mut CompositeModuleContext, feedback_gain: f64, delay: usize,
    ) -> Result<Stream, GraphError>;
}

impl EchoExt for Stream {
    fn echo(self, k: &mut CompositeModuleContext, feedback_gain: f64, delay: usize) -> Result<Stream, GraphError> {
        if delay == 0 {
            return Err(GraphError::InvalidConfig("echo delay must be at least one sample".to_string()));
        }
        let t = self.num_typ(k)?;
        let gain = Fixp::from_f64(t, feedback_gain)?;

        let (dout, feedback_dout) = k.feedback(ValueTyp::Num(t))?;
        let feedback = dout.decouple(k, delay, vec![])?.prefill(k, delay, self)?;
        let feedback_attenuated = feedback.mul_const(k, gain)?.trunc(k, t)?;
        let dout_next = self.add(k, feedback_attenuated)?.trunc(k, t)?;
        feedback_dout.connect(k, dout_next)?;
        Ok(dout_next)
    }

    fn stereo_echo(
        self, k: &mut CompositeModuleContext, feedback_gain: f64, delay: usize,
    ) -> Result<Stream, GraphError> {
        let channels = self.split(k)?;
        if channels.len() != 2 {
            return Err(GraphError::mismatch(self.id(), "a (left, right) tuple", self.typ(k)));
        }
        let left = channels[0].echo(k, feedback_gain, delay)?;
        let right = channels[1].echo(k, feedback_gain, delay)?;
        k.concat(&[left, right])
    }
}

/// Echo module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoConfig {
    /// Gain of the feedback loop
    pub feedback_gain: f64,

    /// Samples per second
    pub sample_rate: f64,

    /// Delay in seconds
    pub delay: f64,

    /// Sample type
    pub din_t: FixpType,

    /// Two channels
    #[serde(default)]
    pub stereo: bool,
}

impl EchoConfig {
    /// Delay in samples.
    pub fn delay_samples(&self) -> usize { (self.sample_rate * self.delay).round() as usize }

    /// Builds the effect with `din` and `dout` ports.
    pub fn module(&self) -> Result<Module, GraphError> {
        let delay = self.delay_samples();
        tracing::debug!(delay, depth = ceil_pow2(delay), "echo buffer");
        composite("echo", |k| {
            let dout = if self.stereo {
                let din = k.input(DIN, ValueTyp::Tuple(vec![ValueTyp::Num(self.din_t); 2]))?;
                din.stereo_echo(k, self.feedback_gain, delay)?
            } else {
                let din = k.input(DIN, ValueTyp::Num(self.din_t))?;
                din.echo(k, self.feedback_gain, delay)?
            };
            k.output(DOUT, dout)
        })
    }
}

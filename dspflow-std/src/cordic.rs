//! CORDIC sine and cosine generator.
//!
//! The phase is an unsigned integer of `pw` bits covering one full turn. The first stage maps it into
//! `[-pi/2, pi/2)`, negating the start vector when it rotates by `pi`, and every following stage rotates by the
//! micro-angle `atan(2^-i)` toward zero residual phase, clockwise when the residual is not positive. Outputs are
//! rounded half up from the working width. Each stage ends in a register.

use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};

use crate::*;

/// Derived CORDIC parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CordicParams {
    /// Input (start vector) width
    pub iw: u32,

    /// Output width
    pub ow: u32,

    /// Phase width
    pub pw: u32,

    /// Working width of the vector
    pub ww: u32,

    /// Start vector `(2^(iw-1) - 1) / sqrt(2)` at the working width
    pub start: i128,

    /// Number of rotation stages
    pub nstages: usize,

    /// Micro-angles `atan(2^-i)` in phase units
    pub angles: Vec<i128>,

    /// Magnitude gain of the rotations
    pub gain: f64,
}

impl CordicParams {
    /// Derives the parameters for the given widths.
    pub fn new(iw: u32, ow: u32, pw: u32) -> Result<Self, GraphError> {
        if iw < 2 || ow < 2 || pw < 3 {
            return Err(GraphError::InvalidConfig(format!("invalid CORDIC widths iw={}, ow={}, pw={}", iw, ow, pw)));
        }
        let ww = iw.max(ow) + 4;
        let nstages = ow as usize;
        let start = (((1i128 << (iw - 1)) - 1) as f64 * 2f64.powi((ww - iw - 1) as i32) / SQRT_2).floor() as i128;
        let turn = 2f64.powi(pw as i32);
        let angles =
            (0..nstages).map(|i| (0.5f64.powi(i as i32).atan() * turn / (2.0 * PI)).round() as i128).collect();
        let gain = (0..nstages).map(|i| (1.0 + 0.25f64.powi(i as i32)).sqrt()).product();
        // Validates every width used by the stages.
        let _ = FixpType::try_new(true, ww, 0)?;
        let _ = FixpType::try_new(true, pw, 0)?;
        tracing::debug!(iw, ow, pw, ww, start, nstages, gain, "cordic parameters");
        Ok(Self { iw, ow, pw, ww, start, nstages, angles, gain })
    }

    /// Amplitude of the outputs.
    pub fn amplitude(&self, norm_gain: bool) -> f64 {
        let amplitude = self.start as f64 * 2f64.powi(self.ow as i32 - self.ww as i32);
        if norm_gain {
            amplitude
        } else {
            amplitude * self.gain
        }
    }

    /// Latency in ticks.
    pub fn latency(&self) -> usize { self.nstages + 1 }
}

/// Multiplies by `2^-shift`.
fn scale_pow2(k: &mut CompositeModuleContext, din: Stream, shift: i32) -> Result<Stream, GraphError> {
    let factor = match shift {
        0 => return Ok(din),
        s if s > 0 => Fixp::from_raw(FixpType::try_new(false, 0, s as u32)?, 1)?,
        s => Fixp::from_int(FixpType::try_new(false, (-s) as u32 + 1, 0)?, 1 << (-s))?,
    };
    din.mul_const(k, factor)
}

/// CORDIC extension.
pub trait CordicExt {
    /// Maps the phase into the convergence range and outputs the registered `(x, y, z)` start vector.
    fn cordic_first_stage(self, k: &mut CompositeModuleContext, params: &CordicParams) -> Result<Stream, GraphError>;

    /// Rotation stage `i` on a registered `(x, y, z)` vector.
    fn cordic_stage(
        self, k: &mut CompositeModuleContext, params: &CordicParams, i: usize,
    ) -> Result<Stream, GraphError>;

    /// Outputs `(sin, cos)` of the phase, scaled back to unit gain if `norm_gain` is set.
    fn cordic_sin_cos(
        self, k: &mut CompositeModuleContext, params: &CordicParams, norm_gain: bool,
    ) -> Result<Stream, GraphError>;
}

impl CordicExt for Stream {
    fn cordic_first_stage(self, k: &mut CompositeModuleContext, params: &CordicParams) -> Result<Stream, GraphError> {
        let phase_t = self.num_typ(k)?;
        let expected = FixpType::try_new(false, params.pw, 0)?;
        if phase_t != expected {
            return Err(GraphError::mismatch("cordic phase", expected, phase_t));
        }
        let z_t = FixpType::try_new(true, params.pw, 0)?;
        let w_t = FixpType::try_new(true, params.ww, 0)?;

        let quarter = Fixp::from_int(FixpType::try_new(false, params.pw - 1, 0)?, 1 << (params.pw - 2))?;
        let half = Fixp::from_int(expected, 1 << (params.pw - 1))?;
        let z = self.trunc(k, z_t)?;
        let z_flipped = self.add_const(k, half)?.trunc(k, z_t)?;
        // The phase lies in [pi/2, 3pi/2) iff it is negative a quarter turn later.
        let flip = self.add_const(k, quarter)?.trunc(k, z_t)?.is_neg(k)?;

        let x0_pos = k.constant(Value::Num(Fixp::from_int(w_t, params.start)?))?;
        let x0_neg = k.constant(Value::Num(Fixp::from_int(w_t, -params.start)?))?;
        let y0 = k.constant(Value::Num(Fixp::zero(w_t)))?;

        let straight = k.concat(&[x0_pos, y0, z])?;
        let flipped = k.concat(&[x0_neg, y0, z_flipped])?;
        k.mux(flip, &[straight, flipped])?.reg(k, None)
    }

    fn cordic_stage(
        self, k: &mut CompositeModuleContext, params: &CordicParams, i: usize,
    ) -> Result<Stream, GraphError> {
        let z_t = FixpType::try_new(true, params.pw, 0)?;
        let w_t = FixpType::try_new(true, params.ww, 0)?;
        let angle = *some_or!(
            params.angles.get(i),
            return Err(GraphError::InvalidConfig(format!("CORDIC has no stage {}", i)))
        );
        let angle = Fixp::from_int(z_t, angle)?;

        let fields = self.split(k)?;
        let (x, y, z) = (fields[0], fields[1], fields[2]);
        let xs = scale_pow2(k, x, i as i32)?.trunc(k, w_t)?;
        let ys = scale_pow2(k, y, i as i32)?.trunc(k, w_t)?;
        let angle = k.constant(Value::Num(angle))?;

        // Residual phase positive: rotate counterclockwise.
        let x_ccw = x.sub(k, ys)?.trunc(k, w_t)?;
        let y_ccw = y.add(k, xs)?.trunc(k, w_t)?;
        let z_ccw = z.sub(k, angle)?.trunc(k, z_t)?;
        let ccw = k.concat(&[x_ccw, y_ccw, z_ccw])?;

        let x_cw = x.add(k, ys)?.trunc(k, w_t)?;
        let y_cw = y.sub(k, xs)?.trunc(k, w_t)?;
        let z_cw = z.add(k, angle)?.trunc(k, z_t)?;
        let cw = k.concat(&[x_cw, y_cw, z_cw])?;

        let positive = z.neg(k)?.is_neg(k)?;
        k.mux(positive, &[cw, ccw])?.reg(k, None)
    }

    fn cordic_sin_cos(
        self, k: &mut CompositeModuleContext, params: &CordicParams, norm_gain: bool,
    ) -> Result<Stream, GraphError> {
        let mut vector = self.cordic_first_stage(k, params)?;
        for i in 0..params.nstages {
            vector = vector.cordic_stage(k, params, i)?;
        }

        let fields = vector.split(k)?;
        let (x, y) = (fields[0], fields[1]);
        let (x, y) = if norm_gain {
            let inv_gain = Fixp::from_f64(FixpType::try_new(false, 0, params.ww)?, 1.0 / params.gain)?;
            (x.mul_const(k, inv_gain)?, y.mul_const(k, inv_gain)?)
        } else {
            (x, y)
        };

        let out_t = FixpType::try_new(true, params.ow, 0)?;
        let shift = params.ww as i32 - params.ow as i32;
        let sin = scale_pow2(k, y, shift)?.quantize(k, out_t, Quantization::Round, Overflow::Saturate)?;
        let cos = scale_pow2(k, x, shift)?.quantize(k, out_t, Quantization::Round, Overflow::Saturate)?;
        k.concat(&[sin, cos])
    }
}

/// CORDIC module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CordicConfig {
    /// Input width
    pub iw: u32,

    /// Output width
    pub ow: u32,

    /// Phase width
    pub pw: u32,

    /// Compensate the rotation gain
    #[serde(default)]
    pub norm_gain: bool,
}

impl CordicConfig {
    /// Derived parameters.
    pub fn params(&self) -> Result<CordicParams, GraphError> { CordicParams::new(self.iw, self.ow, self.pw) }

    /// Builds the generator: phase on `din`, `(sin, cos)` on `dout`.
    pub fn module(&self) -> Result<Module, GraphError> {
        let params = self.params()?;
        composite("cordic", |k| {
            let din = k.input(DIN, ValueTyp::Num(FixpType::try_new(false, params.pw, 0)?))?;
            let dout = din.cordic_sin_cos(k, &params, self.norm_gain)?;
            k.output(DOUT, dout)
        })
    }
}

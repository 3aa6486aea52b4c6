//! Radix-2 FFT butterfly networks.
//!
//! A complex point is an `Array[num, 2]` of real and imaginary parts. Twiddle factors are constants, so both
//! networks are combinational.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::*;

/// Index table of one stage: first operands, second operands and twiddle indices of every butterfly.
pub type StageIndices = [Vec<usize>; 3];

/// Builds the index table of an iterative FFT with `stages` stages on naturally ordered input.
pub fn fft_index_lists(stages: usize) -> Vec<StageIndices> {
    let n = 1 << stages;
    let bit_reverse = |ix: usize| (0..stages).fold(0, |acc, bit| (acc << 1) | ((ix >> bit) & 1));
    (1..=stages)
        .map(|stage| {
            let size = 1 << stage;
            let half = size / 2;
            let mut lists = [vec![], vec![], vec![]];
            for ix in 0..n {
                let (block, j) = (ix / size, ix % size);
                let (mut din0, mut din1) = (block * size + j % half, block * size + half + j % half);
                if stage == 1 {
                    din0 = bit_reverse(din0);
                    din1 = bit_reverse(din1);
                }
                lists[0].push(din0);
                lists[1].push(din1);
                lists[2].push(j * (n / size));
            }
            lists
        })
        .collect()
}

/// Twiddle factors `[cos(2 pi i / n), -sin(2 pi i / n)]` rounded down to `t`, with 1.0 mapped to the maximum of
/// `t`.
pub fn twiddles(n: usize, t: FixpType) -> Result<Vec<[Fixp; 2]>, GraphError> {
    let quantize = |x: f64| -> Result<Fixp, GraphError> {
        let raw = (x / t.quantum()).floor() as i128;
        Ok(Fixp::from_raw(t, raw.min(t.max_raw()))?)
    };
    (0..n)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            Ok([quantize(angle.cos())?, quantize(-angle.sin())?])
        })
        .collect()
}

/// Butterfly extension.
pub trait FftExt {
    /// `self + din1 * w` on complex points.
    fn butterfly_sum(self, k: &mut CompositeModuleContext, din1: Stream, w: &[Fixp; 2]) -> Result<Stream, GraphError>;

    /// Iterative FFT of an array of complex points following an index table.
    fn fft_list(
        self, k: &mut CompositeModuleContext, index_lists: &[StageIndices], wn: &[[Fixp; 2]], output_t: FixpType,
    ) -> Result<Stream, GraphError>;

    /// Recursive FFT of an array of complex points, split into even and odd points at build time.
    fn fft_recursive(
        self, k: &mut CompositeModuleContext, wn: &[[Fixp; 2]], output_t: FixpType,
    ) -> Result<Stream, GraphError>;
}

/// Formats every part of every point.
fn format_points(k: &mut CompositeModuleContext, points: &[Stream], t: FixpType) -> Result<Stream, GraphError> {
    let points = points
        .iter()
        .map(|point| {
            let parts = point.split(k)?.into_iter().map(|part| part.format_fixp(k, t)).collect::<Result<Vec<_>, _>>()?;
            k.pack(&parts)
        })
        .collect::<Result<Vec<_>, GraphError>>()?;
    k.pack(&points)
}

fn points(k: &mut CompositeModuleContext, din: Stream) -> Result<Vec<Stream>, GraphError> {
    let len = match din.typ(k) {
        ValueTyp::Array(_, len) if len.is_power_of_two() => len,
        typ => return Err(GraphError::mismatch(din.id(), "an array of 2^n complex points", typ)),
    };
    (0..len).map(|i| din.field(k, i)).collect()
}

fn recursive(k: &mut CompositeModuleContext, points: &[Stream], wn: &[[Fixp; 2]]) -> Result<Vec<Stream>, GraphError> {
    let n = points.len();
    if n == 1 {
        return Ok(points.to_vec());
    }

    let (even, odd): (Vec<_>, Vec<_>) = points.iter().enumerate().partition_map(|(i, point)| {
        if i % 2 == 0 {
            itertools::Either::Left(*point)
        } else {
            itertools::Either::Right(*point)
        }
    });
    let y0 = recursive(k, &even, wn)?;
    let y1 = recursive(k, &odd, wn)?;
    (0..n).map(|i| y0[i % (n / 2)].butterfly_sum(k, y1[i % (n / 2)], &wn[i * (wn.len() / n)])).collect()
}

impl FftExt for Stream {
    fn butterfly_sum(self, k: &mut CompositeModuleContext, din1: Stream, w: &[Fixp; 2]) -> Result<Stream, GraphError> {
        let (re0, im0) = (self.field(k, 0)?, self.field(k, 1)?);
        let (re1, im1) = (din1.field(k, 0)?, din1.field(k, 1)?);

        let re1_w0 = re1.mul_const(k, w[0])?;
        let im1_w1 = im1.mul_const(k, w[1])?;
        let re = re0.add(k, re1_w0)?.sub(k, im1_w1)?;

        let re1_w1 = re1.mul_const(k, w[1])?;
        let im1_w0 = im1.mul_const(k, w[0])?;
        let im = im0.add(k, re1_w1)?.add(k, im1_w0)?;

        k.pack(&[re, im])
    }

    fn fft_list(
        self, k: &mut CompositeModuleContext, index_lists: &[StageIndices], wn: &[[Fixp; 2]], output_t: FixpType,
    ) -> Result<Stream, GraphError> {
        let mut din = points(k, self)?;
        if din.len() != 1 << index_lists.len() || wn.len() != din.len() {
            return Err(GraphError::InvalidConfig(format!(
                "{} stages and {} twiddles do not fit {} points",
                index_lists.len(),
                wn.len(),
                din.len()
            )));
        }

        for [din0, din1, w] in index_lists {
            din = (0..din.len())
                .map(|ix| din[din0[ix]].butterfly_sum(k, din[din1[ix]], &wn[w[ix]]))
                .collect::<Result<Vec<_>, _>>()?;
        }
        format_points(k, &din, output_t)
    }

    fn fft_recursive(
        self, k: &mut CompositeModuleContext, wn: &[[Fixp; 2]], output_t: FixpType,
    ) -> Result<Stream, GraphError> {
        let din = points(k, self)?;
        if wn.len() != din.len() {
            return Err(GraphError::InvalidConfig(format!("{} twiddles do not fit {} points", wn.len(), din.len())));
        }
        let dout = recursive(k, &din, wn)?;
        format_points(k, &dout, output_t)
    }
}

/// FFT implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftImpl {
    /// Index-table driven
    #[default]
    List,

    /// Even/odd recursion
    Recursive,
}

/// FFT module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FftConfig {
    /// Number of stages, the transform size is `2^stages`
    pub stages: usize,

    /// Twiddle factor type
    pub twiddle_t: FixpType,

    /// Input part type
    pub din_t: FixpType,

    /// Output part type
    pub dout_t: FixpType,

    /// Implementation
    #[serde(default)]
    pub implementation: FftImpl,
}

impl FftConfig {
    /// Transform size.
    pub fn size(&self) -> usize { 1 << self.stages }

    /// Input type: `Array[Array[din_t, 2], size]`.
    pub fn din_typ(&self) -> ValueTyp { ValueTyp::array(ValueTyp::array(ValueTyp::Num(self.din_t), 2), self.size()) }

    /// Builds the transform with `din` and `dout` ports.
    pub fn module(&self) -> Result<Module, GraphError> {
        let wn = twiddles(self.size(), self.twiddle_t)?;
        composite("fft", |k| {
            let din = k.input(DIN, self.din_typ())?;
            let dout = match self.implementation {
                FftImpl::List => din.fft_list(k, &fft_index_lists(self.stages), &wn, self.dout_t)?,
                FftImpl::Recursive => din.fft_recursive(k, &wn, self.dout_t)?,
            };
            k.output(DOUT, dout)
        })
    }
}

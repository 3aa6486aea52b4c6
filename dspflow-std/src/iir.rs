//! Infinite impulse response filters built from second-order sections.
//!
//! A section is given by its feed-forward coefficients `b = [b0, b1, b2]` and feedback coefficients
//! `a = [a0, a1, a2]`, with `a0` normalized to one:
//!
//! ```text
//! y[n] = b0 x[n] + b1 x[n-1] + b2 x[n-2] - a1 y[n-1] - a2 y[n-2]
//! ```

use serde::{Deserialize, Serialize};

use crate::*;

/// Section structure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IirForm {
    /// Direct form I
    #[default]
    Df1,

    /// Transposed direct form II
    Df2t,
}

/// Second-order section coefficients.
pub type Sos = [Fixp; 3];

/// IIR filter extension.
pub trait IirExt {
    /// Direct form I section. The output keeps the type of the feed-forward accumulator.
    fn iir_df1_section(
        self, k: &mut CompositeModuleContext, b: &Sos, a: &Sos, gain: Fixp,
    ) -> Result<Stream, GraphError>;

    /// Transposed direct form II section. The output has the input type.
    fn iir_df2t_section(
        self, k: &mut CompositeModuleContext, b: &Sos, a: &Sos, gain: Fixp,
    ) -> Result<Stream, GraphError>;

    /// Cascade of direct form I sections followed by the output gain.
    fn iir_df1dsos(
        self, k: &mut CompositeModuleContext, b: &[Sos], a: &[Sos], gain: &[Fixp], ogain: Fixp,
    ) -> Result<Stream, GraphError>;

    /// Cascade of transposed direct form II sections followed by the output gain.
    fn iir_df2tsos(
        self, k: &mut CompositeModuleContext, b: &[Sos], a: &[Sos], gain: &[Fixp], ogain: Fixp,
    ) -> Result<Stream, GraphError>;
}

/// Scales the input by `gain`, keeping the input type.
fn input_gain(k: &mut CompositeModuleContext, din: Stream, gain: Fixp) -> Result<Stream, GraphError> {
    let t = din.num_typ(k)?;
    din.mul_const(k, gain)?.format_fixp(k, t)
}

/// Smallest signed type holding every coefficient.
fn coef_typ(b: &Sos, a: &Sos) -> Result<FixpType, GraphError> {
    let (int_bits, frac_bits) = b.iter().chain(&a[1..]).fold((1, 0), |(int_bits, frac_bits), coef| {
        let t = coef.typ();
        (int_bits.max(t.int_bits() + u32::from(!t.signed())), frac_bits.max(t.frac_bits()))
    });
    Ok(FixpType::try_new(true, int_bits, frac_bits)?)
}

impl IirExt for Stream {
    fn iir_df1_section(
        self, k: &mut CompositeModuleContext, b: &Sos, a: &Sos, gain: Fixp,
    ) -> Result<Stream, GraphError> {
        let x = input_gain(k, self, gain)?;
        // State advances only on ticks with a sample.
        let sample = x.valid(k)?;

        let zu1 = x.reg_zero(k)?;
        let zu2 = zu1.when(k, sample)?.reg_zero(k)?;
        let p0 = x.mul_const(k, b[0])?;
        let p1 = zu1.mul_const(k, b[1])?;
        let p2 = zu2.mul_const(k, b[2])?;
        let ff = p0.add(k, p1)?.add(k, p2)?;
        let acc_t = ff.num_typ(k)?;

        let (y, feedback) = k.feedback(ValueTyp::Num(acc_t))?;
        let zy1 = y.decouple(k, 1, vec![Value::Num(Fixp::zero(acc_t))])?;
        zy1.set_ready(k, sample)?;
        let zy1 = zy1.output();
        let zy2 = zy1.when(k, sample)?.reg_zero(k)?;

        let q1 = zy1.mul_const(k, a[1])?;
        let q2 = zy2.mul_const(k, a[2])?;
        let y_next = ff.sub(k, q1)?.sub(k, q2)?.format_fixp(k, acc_t)?;
        feedback.connect(k, y_next)?;
        Ok(y_next)
    }

    fn iir_df2t_section(
        self, k: &mut CompositeModuleContext, b: &Sos, a: &Sos, gain: Fixp,
    ) -> Result<Stream, GraphError> {
        let t = self.num_typ(k)?;
        let x = input_gain(k, self, gain)?;

        // State type: a product with two guard bits.
        let prod_t = t.mul_typ(coef_typ(b, a)?)?;
        let z_t = FixpType::try_new(true, prod_t.int_bits() + 2, prod_t.frac_bits())?;
        let (z0, z0_feedback) = k.feedback(ValueTyp::Num(z_t))?;
        let (z1, z1_feedback) = k.feedback(ValueTyp::Num(z_t))?;

        let p0 = x.mul_const(k, b[0])?;
        let y = p0.add(k, z0)?.format_fixp(k, t)?;

        let p1 = x.mul_const(k, b[1])?;
        let q1 = y.mul_const(k, a[1])?;
        let z0_next = p1.sub(k, q1)?.add(k, z1)?.saturate(k, z_t)?;

        let p2 = x.mul_const(k, b[2])?;
        let q2 = y.mul_const(k, a[2])?;
        let z1_next = p2.sub(k, q2)?.saturate(k, z_t)?;

        let z0_reg = z0_next.reg_zero(k)?;
        z0_feedback.connect(k, z0_reg)?;
        let z1_buf = z1_next.decouple(k, 1, vec![Value::Num(Fixp::zero(z_t))])?;
        let sample = x.valid(k)?;
        z1_buf.set_ready(k, sample)?;
        z1_feedback.connect(k, z1_buf.output())?;
        Ok(y)
    }

    fn iir_df1dsos(
        self, k: &mut CompositeModuleContext, b: &[Sos], a: &[Sos], gain: &[Fixp], ogain: Fixp,
    ) -> Result<Stream, GraphError> {
        cascade(k, self, IirForm::Df1, b, a, gain, ogain)
    }

    fn iir_df2tsos(
        self, k: &mut CompositeModuleContext, b: &[Sos], a: &[Sos], gain: &[Fixp], ogain: Fixp,
    ) -> Result<Stream, GraphError> {
        cascade(k, self, IirForm::Df2t, b, a, gain, ogain)
    }
}

fn cascade(
    k: &mut CompositeModuleContext, din: Stream, form: IirForm, b: &[Sos], a: &[Sos], gain: &[Fixp], ogain: Fixp,
) -> Result<Stream, GraphError> {
    if b.is_empty() || b.len() != a.len() || b.len() != gain.len() {
        return Err(GraphError::InvalidConfig(format!(
            "IIR cascade needs matching non-empty coefficient lists, got {} b, {} a and {} gains",
            b.len(),
            a.len(),
            gain.len()
        )));
    }

    let t = din.num_typ(k)?;
    let mut x = din;
    for ((b, a), gain) in b.iter().zip(a).zip(gain) {
        x = match form {
            IirForm::Df1 => x.iir_df1_section(k, b, a, *gain)?,
            IirForm::Df2t => x.iir_df2t_section(k, b, a, *gain)?,
        };
        x = x.format_fixp(k, t)?;
    }
    x.mul_const(k, ogain)?.format_fixp(k, t)
}

/// IIR filter module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IirConfig {
    /// Feed-forward coefficients per section
    pub b: Vec<[f64; 3]>,

    /// Feedback coefficients per section, `a[0]` is ignored
    pub a: Vec<[f64; 3]>,

    /// Input gain per section, unity if empty
    #[serde(default)]
    pub gain: Vec<f64>,

    /// Output gain
    #[serde(default = "unity")]
    pub ogain: f64,

    /// Coefficient type
    pub coef_t: FixpType,

    /// Gain type
    pub gain_t: FixpType,

    /// Sample type
    pub din_t: FixpType,

    /// Section structure
    #[serde(default)]
    pub form: IirForm,
}

fn unity() -> f64 { 1.0 }

impl IirConfig {
    /// Builds the filter with `din` and `dout` ports.
    pub fn module(&self) -> Result<Module, GraphError> {
        let quantize = |coefs: &[[f64; 3]]| -> Result<Vec<Sos>, GraphError> {
            coefs
                .iter()
                .map(|sos| -> Result<Sos, GraphError> {
                    Ok([
                        Fixp::from_f64(self.coef_t, sos[0])?,
                        Fixp::from_f64(self.coef_t, sos[1])?,
                        Fixp::from_f64(self.coef_t, sos[2])?,
                    ])
                })
                .collect()
        };
        let b = quantize(&self.b)?;
        let a = quantize(&self.a)?;
        let gain = if self.gain.is_empty() { vec![1.0; self.b.len()] } else { self.gain.clone() };
        let gain = gain.iter().map(|g| Fixp::from_f64(self.gain_t, *g)).collect::<Result<Vec<_>, _>>()?;
        let ogain = Fixp::from_f64(self.gain_t, self.ogain)?;

        composite("iir", |k| {
            let din = k.input(DIN, ValueTyp::Num(self.din_t))?;
            let dout = match self.form {
                IirForm::Df1 => din.iir_df1dsos(k, &b, &a, &gain, ogain)?,
                IirForm::Df2t => din.iir_df2tsos(k, &b, &a, &gain, ogain)?,
            };
            k.output(DOUT, dout)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: FixpType = FixpType::fixp(4, 12);

    fn one_pole(form: IirForm) -> IirConfig {
        IirConfig {
            b: vec![[1.0, 0.0, 0.0]],
            a: vec![[1.0, -0.5, 0.0]],
            gain: vec![],
            ogain: 1.0,
            coef_t: FixpType::fixp(2, 14),
            gain_t: FixpType::fixp(2, 14),
            din_t: T,
            form,
        }
    }

    #[test]
    fn one_pole_impulse_response() {
        for form in [IirForm::Df1, IirForm::Df2t] {
            let module = one_pole(form).module().unwrap();
            let dout = sim::drive_collect_f64(&module, &[1.0, 0.0, 0.0, 0.0, 0.0], 5, 100).unwrap();
            assert_eq!(dout, vec![1.0, 0.5, 0.25, 0.125, 0.0625], "{:?}", form);
        }
    }

    #[test]
    fn two_sections_with_gains() {
        // Two-tap averagers, halved at the input of the second section and doubled at the output.
        for form in [IirForm::Df1, IirForm::Df2t] {
            let config = IirConfig {
                b: vec![[0.5, 0.5, 0.0], [0.5, 0.5, 0.0]],
                a: vec![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
                gain: vec![1.0, 0.5],
                ogain: 2.0,
                gain_t: FixpType::fixp(3, 13),
                ..one_pole(form)
            };
            let module = config.module().unwrap();
            let dout = sim::drive_collect_f64(&module, &[4.0, 0.0, 0.0, 0.0], 4, 100).unwrap();
            assert_eq!(dout, vec![1.0, 2.0, 1.0, 0.0], "{:?}", form);
        }
    }

    #[test]
    fn mismatched_sections_are_rejected() {
        let config = IirConfig { gain: vec![1.0, 1.0], ..one_pole(IirForm::Df1) };
        assert!(matches!(config.module(), Err(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn feedback_is_broken_by_state() {
        let module = one_pole(IirForm::Df1).module().unwrap();
        assert!(module.num_stateful() >= 4);
    }
}

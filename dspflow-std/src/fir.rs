//! Finite impulse response filters.

use serde::{Deserialize, Serialize};

use crate::*;

/// FIR filter structure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirForm {
    /// Delay line on the input
    #[default]
    Direct,

    /// Delay line on the partial sums
    Transposed,
}

/// FIR filter extension.
pub trait FirExt {
    /// Direct form: `y[n] = b[0] x[n] + b[1] x[n-1] + ...`, the delay line starting at zero.
    fn fir_direct(self, k: &mut CompositeModuleContext, b: &[Fixp]) -> Result<Stream, GraphError>;

    /// Transposed form of [`FirExt::fir_direct`]: same response, registers on the accumulator.
    fn fir_transposed(self, k: &mut CompositeModuleContext, b: &[Fixp]) -> Result<Stream, GraphError>;
}

fn no_taps() -> GraphError { GraphError::InvalidConfig("FIR filter needs at least one coefficient".to_string()) }

impl FirExt for Stream {
    fn fir_direct(self, k: &mut CompositeModuleContext, b: &[Fixp]) -> Result<Stream, GraphError> {
        let (first, rest) = some_or!(b.split_first(), return Err(no_taps()));
        // The delay line shifts only on ticks with a sample.
        let sample = self.valid(k)?;
        let mut reg_s = self;
        let mut add_s = reg_s.mul_const(k, *first)?;
        for coef in rest {
            reg_s = reg_s.when(k, sample)?.reg_zero(k)?;
            let prod = reg_s.mul_const(k, *coef)?;
            add_s = add_s.add(k, prod)?;
        }
        Ok(add_s)
    }

    fn fir_transposed(self, k: &mut CompositeModuleContext, b: &[Fixp]) -> Result<Stream, GraphError> {
        // The last coefficient enters the accumulator first.
        let (last, rest) = some_or!(b.split_last(), return Err(no_taps()));
        let mut reg_s = self.mul_const(k, *last)?;
        for coef in rest.iter().rev() {
            let gain_s = self.mul_const(k, *coef)?;
            let prev = reg_s.reg_zero(k)?;
            reg_s = gain_s.add(k, prev)?;
        }
        Ok(reg_s)
    }
}

/// FIR filter module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirConfig {
    /// Coefficients
    pub b: Vec<f64>,

    /// Coefficient type
    pub coef_t: FixpType,

    /// Sample type
    pub din_t: FixpType,

    /// Output type, the exact result type if `None`
    #[serde(default)]
    pub dout_t: Option<FixpType>,

    /// Structure
    #[serde(default)]
    pub form: FirForm,
}

impl FirConfig {
    /// Quantized coefficients.
    pub fn coefs(&self) -> Result<Vec<Fixp>, GraphError> {
        Ok(self.b.iter().map(|b| Fixp::from_f64(self.coef_t, *b)).collect::<Result<_, _>>()?)
    }

    /// Builds the filter with `din` and `dout` ports.
    pub fn module(&self) -> Result<Module, GraphError> {
        let b = self.coefs()?;
        composite("fir", |k| {
            let din = k.input(DIN, ValueTyp::Num(self.din_t))?;
            let dout = match self.form {
                FirForm::Direct => din.fir_direct(k, &b)?,
                FirForm::Transposed => din.fir_transposed(k, &b)?,
            };
            let dout = match self.dout_t {
                Some(t) => dout.format_fixp(k, t)?,
                None => dout,
            };
            k.output(DOUT, dout)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: FixpType = FixpType::fixp(4, 4);

    fn config(form: FirForm) -> FirConfig {
        FirConfig { b: vec![0.5, -0.25, 1.0], coef_t: T, din_t: T, dout_t: None, form }
    }

    #[test]
    fn impulse_response() {
        for form in [FirForm::Direct, FirForm::Transposed] {
            let module = config(form).module().unwrap();
            let dout = sim::drive_collect_f64(&module, &[1.0, 0.0, 0.0, 0.0], 4, 100).unwrap();
            assert_eq!(dout, vec![0.5, -0.25, 1.0, 0.0], "{:?}", form);
        }
    }

    #[test]
    fn empty_filter_is_rejected() {
        let config = FirConfig { b: vec![], ..config(FirForm::Direct) };
        assert!(matches!(config.module(), Err(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn output_is_formatted() {
        let t = FixpType::fixp(2, 1);
        let config = FirConfig { dout_t: Some(t), ..config(FirForm::Direct) };
        let module = config.module().unwrap();
        assert_eq!(module.output_typ(DOUT), Some(&ValueTyp::Num(t)));

        // 0.5 * 1.25 = 0.625 rounds to 0.5; 0.5 * 7 - 0.25 * 1.25 saturates to 1.5.
        let dout = sim::drive_collect_f64(&module, &[1.25, 7.0], 2, 100).unwrap();
        assert_eq!(dout, vec![0.5, 1.5]);
    }
}

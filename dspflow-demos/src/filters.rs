//! FIR and IIR filters on a two-tone signal.

use std::f64::consts::PI;

use anyhow::Result;
use dspflow::*;
use dspflow_std::*;

/// Slow tone plus a weaker tone near Nyquist, snapped to `t`.
fn two_tone(t: FixpType, len: usize) -> Result<Vec<f64>> {
    (0..len)
        .map(|n| {
            let n = n as f64;
            let x = 0.5 * (2.0 * PI * 0.02 * n).sin() + 0.25 * (2.0 * PI * 0.45 * n).sin();
            Ok(Fixp::from_f64(t, x)?.to_f64())
        })
        .collect()
}

fn print(x: &[f64], y: &[f64]) {
    for (n, (x, y)) in x.iter().zip(y).enumerate() {
        println!("{:4} {:>12.6} {:>12.6}", n, x, y);
    }
}

pub(crate) fn fir_config() -> FirConfig {
    FirConfig {
        b: vec![0.03, 0.11, 0.22, 0.28, 0.22, 0.11, 0.03],
        coef_t: FixpType::fixp(1, 15),
        din_t: FixpType::fixp(1, 15),
        dout_t: Some(FixpType::fixp(2, 16)),
        form: FirForm::Transposed,
    }
}

pub(crate) fn fir(config: FirConfig, len: usize) -> Result<()> {
    let module = config.module()?;
    crate::describe(&module);

    let x = two_tone(config.din_t, len)?;
    let y = sim::drive_collect_f64(&module, &x, len, len + 16)?;
    print(&x, &y);
    Ok(())
}

pub(crate) fn iir_config() -> IirConfig {
    // 2nd-order Butterworth low-pass at 0.1 of Nyquist.
    IirConfig {
        b: vec![[0.020083365564211236, 0.04016673112842247, 0.020083365564211236]],
        a: vec![[1.0, -1.5610180758007182, 0.6413515380575631]],
        gain: vec![],
        ogain: 1.0,
        coef_t: FixpType::fixp(3, 29),
        gain_t: FixpType::fixp(2, 14),
        din_t: FixpType::fixp(5, 19),
        form: IirForm::Df2t,
    }
}

pub(crate) fn iir(config: IirConfig, len: usize) -> Result<()> {
    let module = config.module()?;
    crate::describe(&module);

    let x = two_tone(config.din_t, len)?;
    let y = sim::drive_collect_f64(&module, &x, len, 4 * len + 16)?;
    print(&x, &y);
    Ok(())
}

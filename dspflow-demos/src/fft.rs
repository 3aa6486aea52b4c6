//! FFT of a ramp.

use anyhow::Result;
use dspflow::*;
use dspflow_std::*;

pub(crate) fn config() -> FftConfig {
    FftConfig {
        stages: 3,
        twiddle_t: FixpType::fixp(1, 7),
        din_t: FixpType::fixp(1, 7),
        dout_t: FixpType::fixp(4, 4),
        implementation: FftImpl::List,
    }
}

pub(crate) fn run(config: FftConfig) -> Result<()> {
    let module = config.module()?;
    crate::describe(&module);

    let n = config.size();
    let points = (0..n)
        .map(|i| {
            let re = Value::from_f64(config.din_t, i as f64 / n as f64)?;
            Ok(Value::Array(vec![re, Value::from_f64(config.din_t, 0.0)?]))
        })
        .collect::<Result<Vec<_>>>()?;

    let dout = sim::drive_collect(&module, vec![Value::Array(points)], 1, 8)?;
    let spectrum = some_or!(dout.first(), anyhow::bail!("no transform was produced"));
    for (i, point) in spectrum.as_slice()?.iter().enumerate() {
        println!("{:4} {:>10.4} {:>10.4}", i, point.field(0)?.to_f64()?, point.field(1)?.to_f64()?);
    }
    Ok(())
}

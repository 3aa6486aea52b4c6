//! Echo of a decaying click.

use anyhow::Result;
use dspflow::*;
use dspflow_std::*;

pub(crate) fn config() -> EchoConfig {
    EchoConfig { feedback_gain: 0.6, sample_rate: 8000.0, delay: 0.001, din_t: FixpType::fixp(1, 15), stereo: false }
}

pub(crate) fn run(config: EchoConfig, len: usize) -> Result<()> {
    let module = config.module()?;
    crate::describe(&module);
    tracing::info!(delay = config.delay_samples(), "echo delay in samples");

    let click = |n: usize| if n < 4 { 0.5 * 0.5f64.powi(n as i32) } else { 0.0 };
    let din = (0..len)
        .map(|n| {
            let x = Value::from_f64(config.din_t, click(n))?;
            Ok(if config.stereo { Value::Tuple(vec![x.clone(), Value::from_f64(config.din_t, -click(n))?]) } else { x })
        })
        .collect::<Result<Vec<_>>>()?;

    for (n, y) in sim::drive_collect(&module, din, len, len + 16)?.iter().enumerate() {
        println!("{:4} {}", n, y);
    }
    Ok(())
}

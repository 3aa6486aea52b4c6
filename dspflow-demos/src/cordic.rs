//! Sine and cosine over a phase ramp.

use anyhow::Result;
use dspflow::*;
use dspflow_std::*;

pub(crate) fn config() -> CordicConfig { CordicConfig { iw: 12, ow: 12, pw: 16, norm_gain: true } }

pub(crate) fn run(config: CordicConfig, len: usize) -> Result<()> {
    let params = config.params()?;
    let module = config.module()?;
    crate::describe(&module);
    tracing::info!(stages = params.nstages, latency = params.latency(), gain = params.gain, "cordic");

    let phase_t = FixpType::try_new(false, config.pw, 0)?;
    let step = (1i128 << config.pw) / len.max(1) as i128;
    let din = (0..len as i128).map(|n| Ok(Value::Num(Fixp::from_int(phase_t, n * step)?))).collect::<Result<Vec<_>>>()?;

    let amplitude = params.amplitude(config.norm_gain);
    let dout = sim::drive_collect(&module, din, len, len + params.latency() + 16)?;
    for (n, value) in dout.into_iter().enumerate() {
        let [sin, cos] = value.into_fields::<2>()?;
        let (sin, cos) = (sin.as_num()?.to_int(), cos.as_num()?.to_int());
        println!("{:4} {:>8} {:>8} {:>10.6} {:>10.6}", n, sin, cos, sin as f64 / amplitude, cos as f64 / amplitude);
    }
    Ok(())
}

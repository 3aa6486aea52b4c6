//! Pulse trains from a list of `(period, width)` configurations.

use anyhow::Result;
use dspflow::*;
use dspflow_std::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PulseDemo {
    #[serde(flatten)]
    generator: PulseConfig,

    /// `(period, width)` pairs
    pulses: Vec<(i128, i128)>,
}

pub(crate) fn config() -> PulseDemo {
    PulseDemo { generator: PulseConfig { period_w: 8, width_w: 8, depth: 4 }, pulses: vec![(8, 2), (4, 0), (6, 4)] }
}

pub(crate) fn run(config: PulseDemo) -> Result<()> {
    let module = config.generator.module()?;
    crate::describe(&module);

    let period_t = FixpType::try_new(false, config.generator.period_w, 0)?;
    let width_t = FixpType::try_new(false, config.generator.width_w, 0)?;
    let din = config
        .pulses
        .iter()
        .map(|(period, width)| {
            Ok(Value::Tuple(vec![
                Value::Num(Fixp::from_int(period_t, *period)?),
                Value::Num(Fixp::from_int(width_t, *width)?),
            ]))
        })
        .collect::<Result<Vec<_>>>()?;
    let len = config.pulses.iter().map(|(period, _)| (*period).max(0) as usize).sum();

    let mut line = String::new();
    for value in sim::drive_collect(&module, din, len, 4 * len + 16)? {
        let (level, eot) = value.as_queue()?;
        line.push(if level.as_bool()? { '#' } else { '_' });
        if eot[0] {
            line.push('|');
        }
    }
    println!("{}", line);
    Ok(())
}

//! Pulse generator.

use serde::{Deserialize, Serialize};

use crate::*;

/// Pulse extension.
pub trait PulseExt {
    /// Generates one pulse per `(period, width)` configuration: `period` ticks of `count > width` for `count` in
    /// `0..period`, framed as a level-1 queue. A zero period yields no output.
    ///
    /// Up to `depth` configurations are buffered while a pulse is running.
    fn pulse(self, k: &mut CompositeModuleContext, depth: usize) -> Result<Stream, GraphError>;
}

impl PulseExt for Stream {
    fn pulse(self, k: &mut CompositeModuleContext, depth: usize) -> Result<Stream, GraphError> {
        match self.typ(k) {
            ValueTyp::Tuple(typs) if typs.len() == 2 && typs.iter().all(|typ| matches!(typ, ValueTyp::Num(_))) => {}
            typ => return Err(GraphError::mismatch(self.id(), "a (period, width) tuple", typ)),
        }

        let cfg = self.decouple(k, depth, vec![])?;
        cfg.consume(k, &[], ValueTyp::queue(ValueTyp::Bool, 1)?, 0usize, |front, _, count| {
            let cfg = some_or!(front, return Ok((None, false, count)));
            let [period, width] = cfg.clone().into_fields::<2>()?;
            let (period, width) = (period.as_num()?.to_int(), width.as_num()?.to_int());
            if period <= 0 {
                return Ok((None, true, 0));
            }

            let count_i = count as i128;
            let last = count_i + 1 >= period;
            let level = Value::queue(Value::Bool(count_i > width), &[last])?;
            Ok((Some(level), last, if last { 0 } else { count + 1 }))
        })
    }
}

/// Pulse generator module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Width of the period field
    pub period_w: u32,

    /// Width of the pulse width field
    pub width_w: u32,

    /// Configurations buffered while a pulse is running
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_depth() -> usize { 4 }

impl PulseConfig {
    /// Configuration type: `(Uint[period_w], Uint[width_w])`.
    pub fn cfg_typ(&self) -> Result<ValueTyp, GraphError> {
        Ok(ValueTyp::Tuple(vec![
            ValueTyp::Num(FixpType::try_new(false, self.period_w, 0)?),
            ValueTyp::Num(FixpType::try_new(false, self.width_w, 0)?),
        ]))
    }

    /// Builds the generator: configurations on `din`, pulses on `dout`.
    pub fn module(&self) -> Result<Module, GraphError> {
        let cfg_typ = self.cfg_typ()?;
        composite("pulse", |k| {
            let din = k.input(DIN, cfg_typ)?;
            let dout = din.pulse(k, self.depth)?;
            k.output(DOUT, dout)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: PulseConfig = PulseConfig { period_w: 8, width_w: 8, depth: 4 };

    fn cfg(period: i128, width: i128) -> Value {
        let num = |x: i128| Value::Num(Fixp::from_int(FixpType::uint(8), x).unwrap());
        Value::Tuple(vec![num(period), num(width)])
    }

    fn levels(values: &[Value]) -> Vec<(bool, bool)> {
        values
            .iter()
            .map(|value| {
                let (level, eot) = value.as_queue().unwrap();
                (level.as_bool().unwrap(), eot[0])
            })
            .collect()
    }

    #[test]
    fn low_for_width_plus_one_ticks() {
        let module = CONFIG.module().unwrap();
        let dout = sim::drive_collect(&module, vec![cfg(5, 1)], 5, 100).unwrap();
        let expected = vec![(false, false), (false, false), (true, false), (true, false), (true, true)];
        assert_eq!(levels(&dout), expected);
    }

    #[test]
    fn configurations_are_queued() {
        let module = CONFIG.module().unwrap();
        let dout = sim::drive_collect(&module, vec![cfg(2, 0), cfg(0, 0), cfg(3, 2)], 5, 100).unwrap();
        let expected = vec![(false, false), (true, true), (false, false), (false, false), (false, true)];
        assert_eq!(levels(&dout), expected);
    }

    #[test]
    fn config_must_be_a_pair() {
        let res = composite("pulse", |k| {
            let din = k.input(DIN, ValueTyp::Num(FixpType::uint(8)))?;
            let dout = din.pulse(k, 4)?;
            k.output(DOUT, dout)
        });
        assert!(matches!(res, Err(GraphError::TypMismatch { .. })));
    }
}

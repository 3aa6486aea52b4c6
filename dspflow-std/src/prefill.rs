//! Prefill.

use crate::*;

/// Prefill extension.
pub trait PrefillExt {
    /// Outputs `num` zeros before forwarding the buffer.
    ///
    /// An element (zero or buffered) counts as consumed on ticks where `take` carries data.
    fn prefill(self, k: &mut CompositeModuleContext, num: usize, take: Stream) -> Result<Stream, GraphError>;
}

impl PrefillExt for Decoupled {
    fn prefill(self, k: &mut CompositeModuleContext, num: usize, take: Stream) -> Result<Stream, GraphError> {
        let typ = self.output().typ(k);
        let zero = Value::zero(&typ);
        self.consume(k, &[take], typ, 0usize, move |front, args, filled| {
            let taken = args[0].is_some();
            if filled < num {
                Ok((Some(zero.clone()), false, filled + usize::from(taken)))
            } else {
                Ok((front.cloned(), taken, filled))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: FixpType = FixpType::int(8);

    fn int(x: i128) -> Value { Value::Num(Fixp::from_int(T, x).unwrap()) }

    #[test]
    fn zeros_come_first() {
        let module = composite("prefill", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            let buf = din.decouple(k, 4, vec![])?;
            let delayed = buf.prefill(k, 2, din)?;
            let dout = k.concat(&[din, delayed])?;
            k.output(DOUT, dout)
        })
        .unwrap();

        let mut sim = Simulator::new(&module);
        sim.drive(DIN, (1..=5).map(int)).unwrap();
        sim.collect(DOUT, Some(5)).unwrap();
        let _ = sim.run(100).unwrap();
        let expected = [(1, 0), (2, 0), (3, 1), (4, 2), (5, 3)]
            .iter()
            .map(|(x, y)| Value::Tuple(vec![int(*x), int(*y)]))
            .collect::<Vec<_>>();
        assert_eq!(sim.collected(DOUT).unwrap(), expected.as_slice());
    }
}

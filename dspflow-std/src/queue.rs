//! Queue framing helpers.

use crate::*;

/// Queue extension.
pub trait QueueExt {
    /// Drops the innermost end-of-transfer level. A level-1 queue becomes its data.
    fn flatten(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError>;

    /// Frames a data stream into level-1 queues of `size` elements.
    fn group(self, k: &mut CompositeModuleContext, size: usize) -> Result<Stream, GraphError>;

    /// Deals the elements of a level-1 queue round-robin to `num` outputs, starting over after every transfer.
    fn deal(self, k: &mut CompositeModuleContext, num: usize) -> Result<Vec<Stream>, GraphError>;
}

impl QueueExt for Stream {
    fn flatten(self, k: &mut CompositeModuleContext) -> Result<Stream, GraphError> {
        let lvl = match self.typ(k) {
            ValueTyp::Queue(_, lvl) => lvl,
            typ => return Err(GraphError::mismatch(self.id(), "a queue", typ)),
        };
        let data = self.queue_data(k)?;
        if lvl == 1 {
            return Ok(data);
        }
        let eot = (1..lvl).map(|l| self.queue_eot(k, l)).collect::<Result<Vec<_>, _>>()?;
        k.queue(data, &eot)
    }

    fn group(self, k: &mut CompositeModuleContext, size: usize) -> Result<Stream, GraphError> {
        if size == 0 {
            return Err(GraphError::InvalidConfig("groups need at least one element".to_string()));
        }
        let typ = ValueTyp::queue(self.typ(k), 1)?;
        k.fsm(&[self], typ, 0usize, move |args, count| {
            let data = some_or!(&args[0], return Ok((None, count)));
            let last = count + 1 == size;
            Ok((Some(Value::queue(data.clone(), &[last])?), if last { 0 } else { count + 1 }))
        })
    }

    fn deal(self, k: &mut CompositeModuleContext, num: usize) -> Result<Vec<Stream>, GraphError> {
        if !matches!(self.typ(k), ValueTyp::Queue(_, 1)) {
            return Err(GraphError::mismatch(self.id(), "a level-1 queue", self.typ(k)));
        }
        if num == 0 {
            return Err(GraphError::InvalidConfig("cannot deal to zero outputs".to_string()));
        }

        let select_t = FixpType::uint(clog2(num).max(1) as u32);
        let select = k.fsm(&[self], ValueTyp::Num(select_t), 0usize, move |args, count| {
            let elem = some_or!(&args[0], return Ok((None, count)));
            let (_, eot) = elem.as_queue()?;
            let next = if eot[0] { 0 } else { (count + 1) % num };
            Ok((Some(Value::Num(Fixp::from_int(select_t, count as i128)?)), next))
        })?;

        (0..num)
            .map(|i| {
                let hit = k.map(&[select], ValueTyp::Bool, move |args| {
                    Ok(Value::Bool(args[0].as_num()?.to_int() == i as i128))
                })?;
                self.when(k, hit)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: FixpType = FixpType::int(8);

    fn elem(x: i128, last: bool) -> Value { Value::queue(Value::Num(Fixp::from_int(T, x).unwrap()), &[last]).unwrap() }

    #[test]
    fn group_marks_every_nth() {
        let module = composite("group", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            let dout = din.group(k, 3)?;
            k.output(DOUT, dout)
        })
        .unwrap();
        let din = (0..6).map(|x| Value::Num(Fixp::from_int(T, x).unwrap())).collect::<Vec<_>>();
        let dout = sim::drive_collect(&module, din, 6, 100).unwrap();
        let expected = (0..6).map(|x| elem(x, x % 3 == 2)).collect::<Vec<_>>();
        assert_eq!(dout, expected);
    }

    #[test]
    fn deal_round_robin() {
        let module = composite("deal", |k| {
            let din = k.input(DIN, ValueTyp::queue(ValueTyp::Num(T), 1)?)?;
            let outs = din.deal(k, 2)?;
            let dout1 = outs[1].flatten(k)?;
            k.output("dout0", outs[0])?;
            k.output("dout1", dout1)
        })
        .unwrap();

        let mut sim = Simulator::new(&module);
        sim.drive(DIN, (0..5).map(|x| elem(x, x == 4))).unwrap();
        sim.collect("dout0", Some(3)).unwrap();
        sim.collect("dout1", Some(2)).unwrap();
        let _ = sim.run(100).unwrap();
        assert_eq!(sim.collected("dout0").unwrap(), &[elem(0, false), elem(2, false), elem(4, true)]);
        assert_eq!(sim.collected_i128("dout1").unwrap(), vec![1, 3]);
    }

    #[test]
    fn flatten_needs_a_queue() {
        let res = composite("flatten", |k| {
            let din = k.input(DIN, ValueTyp::Num(T))?;
            let dout = din.flatten(k)?;
            k.output(DOUT, dout)
        });
        assert!(matches!(res, Err(GraphError::TypMismatch { .. })));
    }
}

//! Column multiplication unit.
//!
//! A unit stores a stripe of columns, then multiplies every buffered row with each stored column in turn.

use crate::*;

/// Stored stripe and replay position.
#[derive(Debug, Clone, Signal)]
struct Stripe {
    columns: Vec<Value>,
    complete: bool,
    replay: usize,
}

impl Stripe {
    fn new() -> Self { Self { columns: vec![], complete: false, replay: 0 } }

    /// One tick of the unit: returns the `(row, column)` pair, whether the row and the column fronts are consumed,
    /// and the next stripe. Columns are only accepted until the stripe is complete.
    fn step(
        mut self, row: Option<&Value>, column: Option<&Value>,
    ) -> Result<(Option<Value>, bool, bool, Self), SimError> {
        let column = if self.complete { None } else { column };
        if let Some(column) = column {
            let (data, eot) = column.as_queue()?;
            self.columns.push(data.clone());
            self.complete = eot[0];
        }
        let pop_column = column.is_some();

        let row = match row {
            Some(row) if self.complete => row,
            _ => return Ok((None, false, pop_column, self)),
        };
        let (row, row_eot) = row.as_queue()?;
        let last_column = self.replay + 1 == self.columns.len();
        let data = Value::Tuple(vec![row.clone(), self.columns[self.replay].clone()]);
        let pair = Value::queue(data, &[last_column, row_eot[0]])?;

        let next = if last_column && row_eot[0] {
            Self::new()
        } else {
            Self { replay: if last_column { 0 } else { self.replay + 1 }, ..self }
        };
        Ok((Some(pair), last_column, pop_column, next))
    }
}

/// Column multiplication extension.
pub trait ColumnMultExt {
    /// Multiplies the buffered rows with a stripe of columns.
    ///
    /// `column` is a level-1 queue whose end-of-transfer marks the last column of the stripe. Rows are level-1
    /// queues whose end-of-transfer marks the last row; the stripe is dropped after it. Columns of the next stripe
    /// wait in a buffer of `stripe_depth` entries while the current one is replayed. The output is a level-2 queue of
    /// dot products, one per row and column: level 0 ends a row, level 1 ends the matrix.
    fn column_multiplication(
        self, k: &mut CompositeModuleContext, column: Stream, stripe_depth: usize,
    ) -> Result<Stream, GraphError>;
}

impl ColumnMultExt for Decoupled {
    fn column_multiplication(
        self, k: &mut CompositeModuleContext, column: Stream, stripe_depth: usize,
    ) -> Result<Stream, GraphError> {
        let row_t = self.output().typ(k);
        let data_t = match &row_t {
            ValueTyp::Queue(data_t, 1) => (**data_t).clone(),
            typ => return Err(GraphError::mismatch(self.output().id(), "a level-1 queue of rows", typ)),
        };
        if column.typ(k) != row_t {
            return Err(GraphError::mismatch(column.id(), row_t, column.typ(k)));
        }
        let columns = column.decouple(k, stripe_depth, vec![])?;

        let pair_t = ValueTyp::queue(ValueTyp::Tuple(vec![data_t.clone(), data_t]), 2)?;
        let zero = Value::zero(&pair_t);

        // (valid, pair, pop row, pop column)
        let fsm_t = ValueTyp::Tuple(vec![ValueTyp::Bool, pair_t, ValueTyp::Bool, ValueTyp::Bool]);
        let out = k.fsm(&[self.output(), columns.output()], fsm_t, Stripe::new(), move |args, stripe: Stripe| {
            let (pair, pop_row, pop_column, next) = stripe.step(args[0].as_ref(), args[1].as_ref())?;
            let valid = pair.is_some();
            let pair = pair.unwrap_or_else(|| zero.clone());
            let out = vec![Value::Bool(valid), pair, Value::Bool(pop_row), Value::Bool(pop_column)];
            Ok((Some(Value::Tuple(out)), next))
        })?;

        let pop_row = out.field(k, 2)?;
        let pop_column = out.field(k, 3)?;
        self.set_ready(k, pop_row)?;
        columns.set_ready(k, pop_column)?;
        let valid = out.field(k, 0)?;
        let pairs = out.field(k, 1)?.when(k, valid)?;

        dot(k, pairs)
    }
}

/// Pipelined dot product of `(row, column)` queue elements, keeping the end-of-transfer bits aligned.
fn dot(k: &mut CompositeModuleContext, din: Stream) -> Result<Stream, GraphError> {
    let data = din.queue_data(k)?;
    let row = data.field(k, 0)?.split(k)?;
    let column = data.field(k, 1)?.split(k)?;

    let mut terms = vec![];
    for (a, b) in row.into_iter().zip(column) {
        let prod = a.mul(k, b)?;
        terms.push(prod.reg(k, None)?);
    }
    let mut latency = 1;

    // Adder tree with a register after every level.
    while terms.len() > 1 {
        let mut next = vec![];
        for pair in terms.chunks(2) {
            let sum = match *pair {
                [a, b] => a.add(k, b)?,
                _ => pair[0],
            };
            next.push(sum.reg(k, None)?);
        }
        terms = next;
        latency += 1;
    }
    let sum = *some_or!(terms.first(), return Err(GraphError::InvalidConfig("empty rows".to_string())));

    let eot_row = din.queue_eot(k, 0)?.pipeline(k, latency)?;
    let eot_matrix = din.queue_eot(k, 1)?.pipeline(k, latency)?;
    k.queue(sum, &[eot_row, eot_matrix])
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: FixpType = FixpType::int(8);

    fn vector(xs: &[i128], last: bool) -> Value {
        let data = xs.iter().map(|x| Value::Num(Fixp::from_int(T, *x).unwrap())).collect();
        Value::queue(Value::Array(data), &[last]).unwrap()
    }

    fn multiply(rows: Vec<Value>, columns: Vec<Value>, expected: usize) -> Vec<(i128, bool, bool)> {
        let row_t = ValueTyp::queue(ValueTyp::array(ValueTyp::Num(T), 3), 1).unwrap();
        let module = composite("column_multiplication", |k| {
            let rows = k.input("rows", row_t.clone())?;
            let columns = k.input("columns", row_t)?;
            let rows = rows.decouple(k, 4, vec![])?;
            let dout = rows.column_multiplication(k, columns, 2)?;
            k.output(DOUT, dout)
        })
        .unwrap();

        let mut sim = Simulator::new(&module);
        sim.drive("rows", rows).unwrap();
        sim.drive("columns", columns).unwrap();
        sim.collect(DOUT, Some(expected)).unwrap();
        let _ = sim.run(100).unwrap();

        sim.collected(DOUT)
            .unwrap()
            .iter()
            .map(|value| {
                let (data, eot) = value.as_queue().unwrap();
                (data.as_num().unwrap().to_int(), eot[0], eot[1])
            })
            .collect()
    }

    #[test]
    fn every_row_meets_every_column() {
        let rows = vec![vector(&[1, 2, 3], false), vector(&[-1, 0, 4], true)];
        let columns = vec![vector(&[1, 1, 1], false), vector(&[2, 0, -1], true)];
        let dout = multiply(rows, columns, 4);
        assert_eq!(dout, vec![(6, false, false), (-1, true, false), (3, false, true), (-6, true, true)]);
    }

    #[test]
    fn next_stripe_waits_for_the_replay() {
        let rows = vec![
            vector(&[1, 2, 3], false),
            vector(&[-1, 0, 4], true),
            vector(&[5, 6, 7], false),
            vector(&[8, 9, 10], true),
        ];
        let columns = vec![
            vector(&[1, 1, 1], false),
            vector(&[2, 0, -1], true),
            vector(&[0, 1, 0], false),
            vector(&[1, 0, 0], true),
        ];
        let dout = multiply(rows, columns, 8);
        assert_eq!(dout, vec![
            (6, false, false),
            (-1, true, false),
            (3, false, true),
            (-6, true, true),
            (6, false, false),
            (5, true, false),
            (9, false, true),
            (8, true, true),
        ]);
    }

    #[test]
    fn complete_stripe_refuses_columns() {
        let stripe = Stripe { columns: vec![vector(&[1, 1, 1], true)], complete: true, replay: 0 };
        let (pair, pop_row, pop_column, next) = stripe.step(None, Some(&vector(&[2, 2, 2], false))).unwrap();
        assert!(pair.is_none());
        assert!(!pop_row);
        assert!(!pop_column);
        assert_eq!(next.columns.len(), 1);
    }
}

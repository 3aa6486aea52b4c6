//! Product of two small integer matrices.

use anyhow::Result;
use dspflow::*;
use dspflow_std::*;

pub(crate) fn config() -> MatrixConfig {
    MatrixConfig { num_rows: 4, num_cols: 4, num_out_cols: 4, cols_per_row: 2, t: FixpType::int(16) }
}

/// Streams `rows x cols` entries of `f` as level-1 queues.
fn stream(config: &MatrixConfig, rows: usize, f: impl Fn(usize, usize) -> i128) -> Result<Vec<Value>> {
    (0..rows)
        .map(|r| {
            let row = (0..config.num_cols).map(|c| Ok(Value::Num(Fixp::from_int(config.t, f(r, c))?)));
            Ok(Value::queue(Value::Array(row.collect::<Result<_>>()?), &[r + 1 == rows])?)
        })
        .collect()
}

pub(crate) fn run(config: MatrixConfig) -> Result<()> {
    let module = config.module()?;
    crate::describe(&module);

    let mat1 = stream(&config, config.num_rows, |r, c| (r * config.num_cols + c) as i128 - 8)?;
    let mat2 = stream(&config, config.num_out_cols, |r, c| if r == c { 2 } else { (c as i128) - (r as i128) })?;
    let timeout = 100 * config.num_rows * config.num_out_cols;
    let dout = sim::simulate(&module, vec![("mat1", mat1), ("mat2", mat2)], timeout)?;

    let dout = some_or!(dout.get(DOUT), anyhow::bail!("no output port"));
    if dout.len() != config.num_outputs()? {
        tracing::warn!(collected = dout.len(), expected = config.num_outputs()?, "incomplete product");
    }
    for value in dout {
        println!("{}", value);
    }
    Ok(())
}

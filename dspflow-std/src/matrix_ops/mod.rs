//! Streaming matrix multiplication.
//!
//! The rows of `mat2` are the columns of the right-hand matrix. They are dealt round-robin to `cols_per_row`
//! column multiplication units, each keeping `num_out_cols / cols_per_row` of them. Every row of `mat1` is
//! broadcast to all units, so one output element carries `cols_per_row` results of the same row.

pub mod mult_by_column;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use mult_by_column::ColumnMultExt;

use crate::*;

/// Matrix multiplier configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Number of rows of `mat1`
    pub num_rows: usize,

    /// Row length of both matrices
    pub num_cols: usize,

    /// Number of rows of `mat2`, i.e. columns of the result
    pub num_out_cols: usize,

    /// Number of column multiplication units
    pub cols_per_row: usize,

    /// Element type
    #[serde(default = "default_elem_t")]
    pub t: FixpType,
}

fn default_elem_t() -> FixpType { FixpType::int(16) }

impl MatrixConfig {
    /// Columns stored by each unit.
    pub fn cols_per_multiplier(&self) -> Result<usize, GraphError> {
        if self.num_rows == 0 || self.num_cols == 0 || self.cols_per_row == 0 || self.num_out_cols == 0 {
            return Err(GraphError::InvalidConfig(format!("empty matrix configuration {:?}", self)));
        }
        if self.num_out_cols % self.cols_per_row != 0 {
            return Err(GraphError::InvalidConfig(format!(
                "{} columns cannot be split among {} units",
                self.num_out_cols, self.cols_per_row
            )));
        }
        Ok(self.num_out_cols / self.cols_per_row)
    }

    /// Input row type: `Queue[Array[t, num_cols], 1]`.
    pub fn row_typ(&self) -> Result<ValueTyp, GraphError> {
        Ok(ValueTyp::queue(ValueTyp::array(ValueTyp::Num(self.t), self.num_cols), 1)?)
    }

    /// Number of output elements.
    pub fn num_outputs(&self) -> Result<usize, GraphError> { Ok(self.num_rows * self.cols_per_multiplier()?) }

    /// Builds the multiplier with `mat1` and `mat2` inputs and a `dout` output.
    pub fn module(&self) -> Result<Module, GraphError> {
        let row_t = self.row_typ()?;
        composite("matrix_multiplication", |k| {
            let mat1 = k.input("mat1", row_t.clone())?;
            let mat2 = k.input("mat2", row_t)?;
            let dout = (mat1, mat2).matrix_multiplication(k, self)?;
            k.output(DOUT, dout)
        })
    }
}

/// Matrix multiplication extension.
pub trait MatrixExt {
    /// Multiplies `mat1` with the transpose of `mat2`, both streamed row by row as level-1 queues.
    ///
    /// Output element `r * cols_per_multiplier + g` carries `C[r][g * cols_per_row + u]` for every unit `u`, with
    /// level 0 ending a row and level 1 ending the matrix.
    fn matrix_multiplication(self, k: &mut CompositeModuleContext, cfg: &MatrixConfig) -> Result<Stream, GraphError>;
}

impl MatrixExt for (Stream, Stream) {
    fn matrix_multiplication(self, k: &mut CompositeModuleContext, cfg: &MatrixConfig) -> Result<Stream, GraphError> {
        let cols_per_multiplier = cfg.cols_per_multiplier()?;
        tracing::debug!(units = cfg.cols_per_row, cols_per_multiplier, "matrix multiplication");
        let (mat1, mat2) = self;

        let rows = mat1.reg(k, None)?;
        let columns = mat2.deal(k, cfg.cols_per_row)?;
        let units = columns
            .into_iter()
            .map(|column| {
                let column = column.flatten(k)?.group(k, cols_per_multiplier)?;
                let rows = rows.decouple(k, cfg.num_rows, vec![])?;
                rows.column_multiplication(k, column, cols_per_multiplier)
            })
            .collect::<Result<Vec<_>, _>>()?;

        join(k, &units)
    }
}

/// Buffers the unit outputs and emits them together once every unit has a result.
fn join(k: &mut CompositeModuleContext, units: &[Stream]) -> Result<Stream, GraphError> {
    let buffers = units.iter().map(|unit| unit.decouple(k, 2 * units.len(), vec![])).collect::<Result<Vec<_>, _>>()?;
    let fronts = buffers.iter().map(|buffer| buffer.output()).collect_vec();
    let ready = k.map(&fronts, ValueTyp::Bool, |_| Ok(Value::Bool(true)))?;
    for buffer in buffers {
        buffer.set_ready(k, ready)?;
    }

    let data = fronts.iter().map(|front| front.queue_data(k)).collect::<Result<Vec<_>, _>>()?;
    let data = k.pack(&data)?;
    let first = *some_or!(fronts.first(), return Err(GraphError::InvalidConfig("nothing to join".to_string())));
    let eot_row = first.queue_eot(k, 0)?;
    let eot_matrix = first.queue_eot(k, 1)?;
    k.queue(data, &[eot_row, eot_matrix])
}

//! Cycle-accurate simulation.

mod harness;
mod simulator;

pub use harness::*;
pub use simulator::*;
use thiserror::Error;

use crate::lir::NodeId;
use crate::num::FixpError;
use crate::value::ValueError;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("there is no port named '{0}'")]
    NoSuchPort(String),
    #[error("buffer {node} of depth {depth} overrun at tick {tick}")]
    BufferOverrun { node: NodeId, depth: usize, tick: usize },
    #[error("selector {select} of {node} is out of range for {len} inputs")]
    SelectOutOfRange { node: NodeId, select: i128, len: usize },
    #[error("type mismatch at {at}: {source}")]
    TypMismatch { at: String, source: ValueError },
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Fixp(#[from] FixpError),
}

//! Low-level IR: node arena, type inference and schedule.

mod graph;
mod module;
mod node;

use thiserror::Error;

pub use graph::*;
pub use module::*;
pub use node::*;

use crate::num::FixpError;
use crate::value::ValueError;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("type mismatch at {at}: expected {expected}, found {found}")]
    TypMismatch { at: String, expected: String, found: String },
    #[error("invalid target type {0}: only numeric targets are allowed")]
    InvalidTarget(String),
    #[error("combinational loop through nodes [{}]", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    CombinationalLoop(Vec<NodeId>),
    #[error("feedback node {0} is never connected")]
    UnconnectedFeedback(NodeId),
    #[error("node {0} is already connected")]
    AlreadyConnected(NodeId),
    #[error("duplicate port '{0}'")]
    DuplicatePort(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Fixp(#[from] FixpError),
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl GraphError {
    /// Type mismatch at `at`.
    pub fn mismatch(at: impl ToString, expected: impl ToString, found: impl ToString) -> Self {
        Self::TypMismatch { at: at.to_string(), expected: expected.to_string(), found: found.to_string() }
    }
}

//! Feedback loops.

use super::*;
use crate::lir::*;

/// Pending feedback edge returned by [`CompositeModuleContext::feedback`].
///
/// The loop is closed by [`Feedback::connect`]. A module with a pending feedback edge fails to build.
#[derive(Debug)]
#[must_use]
pub struct Feedback {
    node: NodeId,
}

impl Feedback {
    pub(crate) fn new(node: NodeId) -> Self { Self { node } }

    /// Closes the loop: the placeholder forwards `source` from now on. Types must match exactly.
    pub fn connect(self, k: &mut CompositeModuleContext, source: Stream) -> Result<(), GraphError> {
        k.graph_mut().connect(self.node, source.id())
    }
}

/// Buffer whose consumer drives a ready signal, returned by [`Stream::decouple`].
#[derive(Debug, Clone, Copy)]
pub struct Decoupled {
    node: NodeId,
}

impl Decoupled {
    pub(crate) fn new(node: NodeId) -> Self { Self { node } }

    /// Front of the buffer.
    pub fn output(self) -> Stream { Stream::new(self.node) }

    /// Connects the consumer's ready signal. The front is popped on ticks where `ready` is `true`.
    pub fn set_ready(self, k: &mut CompositeModuleContext, ready: Stream) -> Result<(), GraphError> {
        k.graph_mut().set_ready(self.node, ready.id())
    }
}

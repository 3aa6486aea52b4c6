//! High-level IR: builder API over the node arena.

mod context;
mod feedback;
mod stream;

pub use context::*;
pub use feedback::*;
pub use stream::*;

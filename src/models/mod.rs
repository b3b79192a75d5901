//! Request-scoped handles for containers, blobs, and queue messages.

mod blob;
mod container;
mod queue;

pub use blob::*;
pub use container::*;
pub use queue::*;

//! # Output sink

use crate::prelude::v1::*;

/// Ordered frame consumer backed by a single output container.
///
/// A sink is opened once per run. Frames must be written in the order they are handed over,
/// and the container is finalised by [`close`](Sink::close), which consumes the sink so that it
/// can not be closed twice.
pub trait Sink<F> {
    /// Append a frame to the output.
    fn write(&mut self, frame: &F) -> Result<()>;

    /// Finalise the output into a playable file.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

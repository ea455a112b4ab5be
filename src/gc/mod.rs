//! Garbage collector module
//!
//! Variables live in a reference-counted slot arena. There is no tracing
//! pass: a block is freed the moment its count drops to zero, and the
//! handles it held are released in the same step. Cycles are not
//! detected and stay alive until the collector itself is dropped.
//!
//! Unlike a process-wide singleton, a collector is an ordinary value owned
//! by whoever drives the runtime (normally [`crate::Context`]).

mod allocator;
mod collector;

use thiserror::Error;

pub use allocator::{BlockHeader, BlockIterator, Counter, Handle, Heap};
pub use collector::{GarbageCollector, Trace};

/// Errors from looking up a handle in a heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The slot was freed (and possibly reused) after the handle was issued
    #[error("stale handle: slot {index} generation {generation} is no longer live")]
    StaleHandle { index: u32, generation: u32 },
    /// The handle points past the end of this heap
    #[error("handle slot {index} is outside this heap")]
    OutOfBounds { index: u32 },
}

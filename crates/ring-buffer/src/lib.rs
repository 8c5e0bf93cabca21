//! Fixed-Capacity Ring Buffer
//!
//! Provides an arena-backed ring buffer for rolling signal windows
//! (closed-eye flags, blink frame indices). Insert and evict are O(1).

mod buffer;

pub use buffer::{Iter, RingBuffer};

use thiserror::Error;

/// Ring buffer error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    /// A window must hold at least one entry
    #[error("Ring buffer capacity must be greater than zero")]
    ZeroCapacity,
}

//! Error surface of the queue layer.
//!
//! Only conditions a submitting client can act on are reported here. Hardware
//! faults never reach this layer; the dispatcher recovers from them on its own.

use thiserror::Error;

/// Convenience result alias for fallible queue operations.
pub type QueueResult<T, E = QueueError> = Result<T, E>;

/// Errors surfaced by slot pools and context queues.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Every slot of the context is waiting for dispatch; retry later or drop the command.
    #[error("work queue no space ({capacity} slots in flight)")]
    NoSpace {
        /// Number of slots owned by the context.
        capacity: u32,
    },

    /// A blocking submitter was interrupted before its command retired.
    #[error("wait for command completion interrupted")]
    Interrupted,

    /// The context was destroyed.
    #[error("context closed")]
    Closed,

    /// Slot pools need at least one slot.
    #[error("slot capacity {requested} must be non-zero")]
    InvalidCapacity {
        /// Capacity that was asked for.
        requested: u32,
    },

    /// The slot arena could not be allocated.
    #[error("failed to allocate {capacity} command slots")]
    AllocationFailed {
        /// Capacity that was asked for.
        capacity: u32,
    },
}

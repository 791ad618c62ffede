#![deny(missing_docs)]
//! Producer-side primitives of the GE2D work-queue engine.
//!
//! Each client of the accelerator owns a [`Context`]: a fixed pool of command
//! slots split between a free-list and a FIFO work-list, plus scratch
//! descriptors where the next command is assembled before it is queued.
//! * [`SlotPool`]: preallocated command slots and the two index queues.
//! * [`Context`] / [`Scratch`]: per-client queue with blocking submission.
//! * [`Doorbell`] / [`Completion`]: wake primitives shared with the dispatcher.
//! * [`QueueError`]: backpressure, interruption and allocation failures.

mod context;
pub mod descriptor;
mod error;
mod slot_pool;
pub mod wait;

pub use context::{Context, ContextId, Dispatch, Scratch};
pub use descriptor::{
    BlendEquation, BlendMode, ClipMode, ClipRect, ColorKey, Command, Config, DpGen, DstData,
    DstGen, FilterType, LogicOp, Rect, ScaleParams, Src1Data, Src1Gen, UpdateFlags, Window,
};
pub use error::{QueueError, QueueResult};
pub use slot_pool::{CommandSlot, SlotId, SlotList, SlotPool, DEFAULT_SLOT_CAPACITY};
pub use wait::{Completion, Doorbell};

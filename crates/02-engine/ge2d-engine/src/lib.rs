//! Dispatch side of the GE2D work-queue engine.
//!
//! [`Manager`] owns the single accelerator: it registers client contexts,
//! runs the dispatcher thread that drains them round-robin, and recovers from
//! hardware hangs with a soft reset. The accelerator itself is reached through
//! the [`RegisterBus`] and [`ClockControl`] collaborator traits.

mod config;
mod error;
pub mod hw;
pub mod irq;
mod manager;
pub mod regs;
mod status;
mod worker;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use hw::{ClockControl, Hardware, NoClock, RegisterBus};
pub use irq::{IrqLine, WaitOutcome};
pub use manager::Manager;
pub use status::StatusSnapshot;
pub use worker::WorkerState;

pub use ge2d_queue as queue;

#![deny(missing_docs)]
//! Simulated GE2D accelerator.
//!
//! [`SimAccelerator`] implements the engine's register bus on top of a
//! register file and a hardware thread; [`SimRig`] wires one to a
//! [`Manager`] the way a platform driver would at load time.

mod accelerator;
mod clock;
mod config;

pub use accelerator::{DispatchRecord, SimAccelerator, SimStats};
pub use clock::SimClock;
pub use config::SimConfig;

use ge2d_engine::{EngineConfig, Manager};
use std::io;
use std::sync::Arc;

/// A manager bound to a simulated accelerator.
pub struct SimRig {
    /// The manager; not started.
    pub manager: Manager,
    /// The accelerator model.
    pub accel: Arc<SimAccelerator>,
    /// Its clock gate.
    pub clock: Arc<SimClock>,
}

impl SimRig {
    /// Builds the accelerator, the manager over it and routes the interrupt.
    pub fn new(engine: EngineConfig, sim: &SimConfig) -> io::Result<Self> {
        let clock = Arc::new(SimClock::new());
        let accel = Arc::new(SimAccelerator::new(sim, Arc::clone(&clock))?);
        let manager = Manager::new(engine, accel.clone(), clock.clone());
        accel.attach_irq(manager.irq_line());
        Ok(Self {
            manager,
            accel,
            clock,
        })
    }
}

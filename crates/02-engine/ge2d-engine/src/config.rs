use ge2d_queue::DEFAULT_SLOT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the manager and its dispatcher thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Command slots preallocated per context.
    pub slot_capacity: u32,
    /// How long the dispatcher waits for the accelerator before soft-resetting it.
    pub hw_timeout_ms: u64,
    /// How long destroying an executing context waits for the dispatcher to let go.
    pub destroy_timeout_ms: u64,
    /// Name of the dispatcher thread.
    pub worker_name: String,
    /// Keep the accelerator clock on between dispatch passes (register capture).
    pub keep_clock_on: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            hw_timeout_ms: 1000,
            destroy_timeout_ms: 500,
            worker_name: "ge2d_monitor".to_string(),
            keep_clock_on: false,
        }
    }
}

impl EngineConfig {
    /// Hardware completion timeout.
    pub fn hw_timeout(&self) -> Duration {
        Duration::from_millis(self.hw_timeout_ms)
    }

    /// Bound on the destroy-while-executing wait.
    pub fn destroy_timeout(&self) -> Duration {
        Duration::from_millis(self.destroy_timeout_ms)
    }
}

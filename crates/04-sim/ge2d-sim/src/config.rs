use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Behaviour of the simulated accelerator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Time each command spends on the accelerator, in microseconds.
    pub latency_us: u64,
    /// Number of commands, counted from power-up, that hang until soft reset.
    pub hang_first: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency_us: 50,
            hang_first: 0,
        }
    }
}

impl SimConfig {
    /// Per-command latency.
    pub fn latency(&self) -> Duration {
        Duration::from_micros(self.latency_us)
    }
}

//! Collaborator interfaces of the accelerator and the thin driver on top of them.

use crate::regs::{self, WriteBatch};
use ge2d_queue::{Command, Config, UpdateFlags};
use log::trace;
use std::sync::Arc;

/// Memory-mapped register access.
pub trait RegisterBus: Send + Sync {
    /// Reads the 32-bit register at `addr`.
    fn read(&self, addr: u32) -> u32;

    /// Writes the 32-bit register at `addr`.
    fn write(&self, addr: u32, value: u32);

    /// Replaces `len` bits starting at bit `start` of the register at `addr`.
    fn set_bits(&self, addr: u32, value: u32, start: u32, len: u32) {
        let mask = if len >= 32 {
            u32::MAX
        } else {
            ((1u32 << len) - 1) << start
        };
        let current = self.read(addr);
        self.write(addr, (current & !mask) | ((value << start) & mask));
    }
}

/// Accelerator clock gate.
pub trait ClockControl: Send + Sync {
    /// Ungates the clock.
    fn enable(&self);
    /// Gates the clock.
    fn disable(&self);
}

/// Clock gate for buses that are always powered.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoClock;

impl ClockControl for NoClock {
    fn enable(&self) {}
    fn disable(&self) {}
}

/// Register-level driver for the accelerator.
pub struct Hardware {
    bus: Arc<dyn RegisterBus>,
    clock: Arc<dyn ClockControl>,
}

impl Hardware {
    /// Wraps a register bus and its clock gate.
    pub fn new(bus: Arc<dyn RegisterBus>, clock: Arc<dyn ClockControl>) -> Self {
        Self { bus, clock }
    }

    /// Whether a started command is still executing.
    pub fn is_busy(&self) -> bool {
        self.bus.read(regs::STATUS0) & regs::STATUS0_BUSY != 0
    }

    /// Pulses the soft reset bit, aborting whatever the accelerator is doing.
    pub fn soft_reset(&self) {
        self.bus.set_bits(regs::GEN_CTRL1, 1, regs::SOFT_RESET_BIT, 1);
        self.bus.set_bits(regs::GEN_CTRL1, 0, regs::SOFT_RESET_BIT, 1);
    }

    /// Programs the general control block to interrupt on command completion.
    pub fn init_gen(&self) {
        self.bus.set_bits(regs::GEN_CTRL0, regs::INT_ON_CMD_DONE, 0, 2);
    }

    /// Rewrites the register groups in `groups`, lowest bit first.
    pub fn apply_config(&self, config: &Config, groups: UpdateFlags) {
        for group in groups.iter() {
            let batch = regs::encode_group(group, config);
            trace!("write {group:?}: {} registers", batch.len());
            self.write_batch(&batch);
        }
    }

    /// Loads `cmd` into the command registers and asserts start.
    pub fn start(&self, cmd: &Command) {
        self.write_batch(&regs::encode_command(cmd));
        self.bus.write(regs::CMD_CTRL, regs::CMD_START);
    }

    /// The two status words, for diagnostics.
    pub fn status(&self) -> (u32, u32) {
        (self.bus.read(regs::STATUS0), self.bus.read(regs::STATUS1))
    }

    /// Ungates the accelerator clock.
    pub fn clock_enable(&self) {
        self.clock.enable();
    }

    /// Gates the accelerator clock.
    pub fn clock_disable(&self) {
        self.clock.disable();
    }

    fn write_batch(&self, batch: &WriteBatch) {
        for &(addr, value) in batch {
            self.bus.write(addr, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct RecordingBus {
        regs: Mutex<BTreeMap<u32, u32>>,
        writes: Mutex<Vec<(u32, u32)>>,
    }

    impl RegisterBus for RecordingBus {
        fn read(&self, addr: u32) -> u32 {
            self.regs.lock().get(&addr).copied().unwrap_or(0)
        }

        fn write(&self, addr: u32, value: u32) {
            self.regs.lock().insert(addr, value);
            self.writes.lock().push((addr, value));
        }
    }

    fn hardware() -> (Hardware, Arc<RecordingBus>) {
        let bus = Arc::new(RecordingBus::default());
        (Hardware::new(bus.clone(), Arc::new(NoClock)), bus)
    }

    #[test]
    fn set_bits_preserves_neighbours() {
        let (_, bus) = hardware();
        bus.write(0x40, 0xffff_0000);
        bus.set_bits(0x40, 0b101, 4, 3);
        assert_eq!(bus.read(0x40), 0xffff_0050);
    }

    #[test]
    fn soft_reset_pulses_bit_31() {
        let (hw, bus) = hardware();
        hw.soft_reset();
        let writes = bus.writes.lock().clone();
        assert_eq!(
            writes,
            vec![(regs::GEN_CTRL1, 1 << 31), (regs::GEN_CTRL1, 0)]
        );
    }

    #[test]
    fn groups_are_applied_in_ascending_order() {
        let (hw, bus) = hardware();
        let groups = UpdateFlags::SCALE_COEF | UpdateFlags::SRC_DATA | UpdateFlags::DP_GEN;
        hw.apply_config(&Config::default(), groups);

        let mut seen = Vec::new();
        for (addr, _) in bus.writes.lock().iter() {
            let group = regs::group_of(*addr).expect("group register");
            if seen.last() != Some(&group) {
                seen.push(group);
            }
        }
        assert_eq!(
            seen,
            vec![UpdateFlags::SRC_DATA, UpdateFlags::DP_GEN, UpdateFlags::SCALE_COEF]
        );
    }

    #[test]
    fn start_is_the_last_write() {
        let (hw, bus) = hardware();
        hw.start(&Command::default());
        assert_eq!(
            bus.writes.lock().last(),
            Some(&(regs::CMD_CTRL, regs::CMD_START))
        );
    }
}

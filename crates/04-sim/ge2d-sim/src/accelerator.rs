//! In-memory accelerator model.
//!
//! Register writes land in a flat register file. Writing start to the command
//! control register snapshots the loaded command, raises busy and posts the
//! job to a hardware thread, which clears busy after the configured latency
//! and raises the interrupt. Soft reset clears busy and invalidates any job
//! still in flight.

use crate::clock::SimClock;
use crate::config::SimConfig;
use crossbeam_channel::{unbounded, Receiver, Sender};
use ge2d_engine::{regs, IrqLine, RegisterBus};
use ge2d_queue::{Command, UpdateFlags};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One command the accelerator was asked to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchRecord {
    /// Position in the dispatch log.
    pub seq: u64,
    /// Command decoded from the command registers.
    pub command: Command,
    /// Register groups written since the previous start.
    pub groups: UpdateFlags,
    /// Source 1 default colour at start time.
    pub src1_color: u32,
    /// Destination base address at start time.
    pub dst_addr: u64,
    /// The command was swallowed by an injected hang.
    pub hung: bool,
}

/// Counters kept by the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Commands started.
    pub starts: u64,
    /// Commands that completed and raised the interrupt.
    pub completed: u64,
    /// Commands swallowed by injected hangs.
    pub hangs: u64,
    /// Soft resets observed.
    pub resets: u64,
    /// Register writes issued while the clock was gated.
    pub gated_writes: u64,
}

enum HwMsg {
    Start { generation: u64 },
    Shutdown,
}

struct SimState {
    regs: Vec<u32>,
    written: UpdateFlags,
    generation: u64,
    hang_budget: u32,
    log: Vec<DispatchRecord>,
    stats: SimStats,
}

impl SimState {
    fn reg(&self, addr: u32) -> u32 {
        self.regs.get((addr / 4) as usize).copied().unwrap_or(0)
    }

    fn set_reg(&mut self, addr: u32, value: u32) {
        match self.regs.get_mut((addr / 4) as usize) {
            Some(slot) => *slot = value,
            None => warn!("write to unmapped register {addr:#x}"),
        }
    }

    fn busy(&self) -> bool {
        self.reg(regs::STATUS0) & regs::STATUS0_BUSY != 0
    }

    fn set_busy(&mut self, busy: bool) {
        let status = self.reg(regs::STATUS0) & !regs::STATUS0_BUSY;
        let busy_bit = if busy { regs::STATUS0_BUSY } else { 0 };
        self.set_reg(regs::STATUS0, status | busy_bit);
    }

    /// Returns the job generation to post, or `None` if the command hangs.
    fn start(&mut self) -> Option<u64> {
        let command = regs::decode_command(|addr| self.reg(addr));
        let dst_addr =
            u64::from(self.reg(regs::DST_ADDR_LO)) | (u64::from(self.reg(regs::DST_ADDR_HI)) << 32);
        let hung = if self.hang_budget > 0 {
            self.hang_budget -= 1;
            true
        } else {
            false
        };
        let record = DispatchRecord {
            seq: self.log.len() as u64,
            command,
            groups: std::mem::take(&mut self.written),
            src1_color: self.reg(regs::SRC1_DEF_COLOR),
            dst_addr,
            hung,
        };
        trace!("start #{} groups {:?} hung {hung}", record.seq, record.groups);
        self.log.push(record);

        self.stats.starts += 1;
        self.generation += 1;
        self.set_busy(true);
        if hung {
            self.stats.hangs += 1;
            None
        } else {
            Some(self.generation)
        }
    }

    fn soft_reset(&mut self) {
        self.stats.resets += 1;
        self.generation += 1;
        self.set_busy(false);
        debug!("soft reset #{}", self.stats.resets);
    }

    fn complete(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.busy() {
            return false;
        }
        self.set_busy(false);
        let done = self.reg(regs::STATUS1).wrapping_add(1);
        self.set_reg(regs::STATUS1, done);
        self.stats.completed += 1;
        true
    }
}

/// Simulated accelerator implementing [`RegisterBus`].
pub struct SimAccelerator {
    state: Arc<Mutex<SimState>>,
    irq: Arc<Mutex<Option<Arc<IrqLine>>>>,
    clock: Arc<SimClock>,
    tx: Sender<HwMsg>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SimAccelerator {
    /// Powers up the model and its hardware thread.
    pub fn new(config: &SimConfig, clock: Arc<SimClock>) -> io::Result<Self> {
        let state = Arc::new(Mutex::new(SimState {
            regs: vec![0; (regs::REG_SPACE / 4) as usize],
            written: UpdateFlags::empty(),
            generation: 0,
            hang_budget: config.hang_first,
            log: Vec::new(),
            stats: SimStats::default(),
        }));
        let irq = Arc::new(Mutex::new(None));
        let (tx, rx) = unbounded();

        let handle = {
            let state = Arc::clone(&state);
            let irq = Arc::clone(&irq);
            let latency = config.latency();
            thread::Builder::new()
                .name("ge2d_sim_hw".into())
                .spawn(move || hw_thread(rx, state, irq, latency))?
        };

        Ok(Self {
            state,
            irq,
            clock,
            tx,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Routes completion interrupts to `irq`.
    pub fn attach_irq(&self, irq: Arc<IrqLine>) {
        *self.irq.lock() = Some(irq);
    }

    /// Makes the next `count` started commands hang until soft reset.
    pub fn hang_next(&self, count: u32) {
        self.state.lock().hang_budget += count;
    }

    /// Every command started so far, oldest first.
    pub fn dispatch_log(&self) -> Vec<DispatchRecord> {
        self.state.lock().log.clone()
    }

    /// Counters.
    pub fn stats(&self) -> SimStats {
        self.state.lock().stats
    }

    /// Whether a command is executing.
    pub fn is_busy(&self) -> bool {
        self.state.lock().busy()
    }
}

impl RegisterBus for SimAccelerator {
    fn read(&self, addr: u32) -> u32 {
        self.state.lock().reg(addr)
    }

    fn write(&self, addr: u32, value: u32) {
        let posted = {
            let mut state = self.state.lock();
            if !self.clock.is_enabled() {
                state.stats.gated_writes += 1;
                warn!("register {addr:#x} written with clock gated");
            }
            if let Some(group) = regs::group_of(addr) {
                state.written |= group;
            }
            match addr {
                regs::CMD_CTRL if value & regs::CMD_START != 0 => state.start(),
                regs::GEN_CTRL1 => {
                    if value & (1 << regs::SOFT_RESET_BIT) != 0 {
                        state.soft_reset();
                    }
                    state.set_reg(addr, value);
                    None
                }
                regs::STATUS0 | regs::STATUS1 => None,
                _ => {
                    state.set_reg(addr, value);
                    None
                }
            }
        };
        if let Some(generation) = posted {
            if self.tx.send(HwMsg::Start { generation }).is_err() {
                warn!("hardware thread gone; command {generation} will never complete");
            }
        }
    }
}

impl Drop for SimAccelerator {
    fn drop(&mut self) {
        let _ = self.tx.send(HwMsg::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

fn hw_thread(
    rx: Receiver<HwMsg>,
    state: Arc<Mutex<SimState>>,
    irq: Arc<Mutex<Option<Arc<IrqLine>>>>,
    latency: Duration,
) {
    while let Ok(msg) = rx.recv() {
        let generation = match msg {
            HwMsg::Start { generation } => generation,
            HwMsg::Shutdown => break,
        };
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        if state.lock().complete(generation) {
            if let Some(irq) = irq.lock().as_ref() {
                irq.raise();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ge2d_engine::{ClockControl, Hardware};
    use ge2d_queue::{Config, Rect};
    use std::sync::atomic::AtomicBool;

    fn rig(config: SimConfig) -> (Arc<SimAccelerator>, Hardware, Arc<IrqLine>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let clock = Arc::new(SimClock::new());
        clock.enable();
        let accel = Arc::new(SimAccelerator::new(&config, Arc::clone(&clock)).expect("sim"));
        let irq = Arc::new(IrqLine::new());
        accel.attach_irq(Arc::clone(&irq));
        let hw = Hardware::new(accel.clone(), clock);
        (accel, hw, irq)
    }

    fn fill_command(x: i32) -> Command {
        Command {
            dst: Rect::new(x, 0, 4, 4).window(),
            src1_fill_color_en: true,
            ..Command::default()
        }
    }

    #[test]
    fn started_command_completes_and_raises_irq() {
        let (accel, hw, irq) = rig(SimConfig {
            latency_us: 20_000,
            ..SimConfig::default()
        });
        let mut config = Config::default();
        config.src1_data.def_color = 0xabcd;
        hw.apply_config(&config, UpdateFlags::SRC_DATA | UpdateFlags::DST_DATA);
        hw.start(&fill_command(12));
        assert!(hw.is_busy());

        let stop = AtomicBool::new(false);
        let outcome = irq.wait_idle(&hw, Duration::from_secs(5), &stop);
        assert_eq!(outcome, ge2d_engine::WaitOutcome::Idle);
        assert_eq!(irq.count(), 1);

        let log = accel.dispatch_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].command, fill_command(12));
        assert_eq!(log[0].groups, UpdateFlags::SRC_DATA | UpdateFlags::DST_DATA);
        assert_eq!(log[0].src1_color, 0xabcd);
        assert_eq!(accel.stats().completed, 1);
        assert_eq!(hw.status().1, 1, "STATUS1 counts completions");
    }

    #[test]
    fn injected_hang_holds_busy_until_soft_reset() {
        let (accel, hw, irq) = rig(SimConfig::default());
        accel.hang_next(1);
        hw.start(&fill_command(0));

        let stop = AtomicBool::new(false);
        assert_eq!(
            irq.wait_idle(&hw, Duration::from_millis(30), &stop),
            ge2d_engine::WaitOutcome::TimedOut
        );
        hw.soft_reset();
        assert!(!accel.is_busy());

        hw.start(&fill_command(1));
        assert_eq!(
            irq.wait_idle(&hw, Duration::from_secs(5), &stop),
            ge2d_engine::WaitOutcome::Idle
        );
        let stats = accel.stats();
        assert_eq!((stats.starts, stats.hangs, stats.resets), (2, 1, 1));
        assert!(accel.dispatch_log()[0].hung);
    }

    #[test]
    fn reset_discards_a_job_in_flight() {
        let (accel, hw, _irq) = rig(SimConfig {
            latency_us: 20_000,
            ..SimConfig::default()
        });
        hw.start(&fill_command(0));
        hw.soft_reset();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(accel.stats().completed, 0);
    }

    #[test]
    fn gated_writes_are_counted() {
        let clock = Arc::new(SimClock::new());
        let accel = SimAccelerator::new(&SimConfig::default(), Arc::clone(&clock)).expect("sim");
        accel.write(regs::ALU_CONST_COLOR, 1);
        clock.enable();
        accel.write(regs::ALU_CONST_COLOR, 2);
        assert_eq!(accel.stats().gated_writes, 1);
        assert_eq!(accel.read(regs::ALU_CONST_COLOR), 2);
        assert_eq!(clock.enables(), 1);
    }
}

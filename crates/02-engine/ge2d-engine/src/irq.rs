//! Hardware completion path.
//!
//! The interrupt handler only calls [`IrqLine::raise`]; everything else runs on
//! the dispatcher thread, which parks in [`IrqLine::wait_idle`] while a command
//! executes.

use crate::hw::Hardware;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How a hardware wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The accelerator reported idle.
    Idle,
    /// The accelerator was still busy when the timeout elapsed.
    TimedOut,
    /// A stop request interrupted the wait while the accelerator was busy.
    Stopped,
}

/// Completion wait queue fed by the accelerator interrupt.
#[derive(Debug, Default)]
pub struct IrqLine {
    raised: Mutex<u64>,
    cond: Condvar,
}

impl IrqLine {
    /// Creates a line that has never fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt handler entry: wakes the dispatcher.
    pub fn raise(&self) {
        *self.raised.lock() += 1;
        self.cond.notify_all();
    }

    /// Wakes the waiter without counting an interrupt.
    pub fn kick(&self) {
        let _guard = self.raised.lock();
        self.cond.notify_all();
    }

    /// Interrupts raised so far.
    pub fn count(&self) -> u64 {
        *self.raised.lock()
    }

    /// Blocks until `hw` reports idle, `timeout` elapses or `stop` is set.
    pub fn wait_idle(&self, hw: &Hardware, timeout: Duration, stop: &AtomicBool) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut raised = self.raised.lock();
        loop {
            if !hw.is_busy() {
                return WaitOutcome::Idle;
            }
            if stop.load(Ordering::Acquire) {
                return WaitOutcome::Stopped;
            }
            if self.cond.wait_until(&mut raised, deadline).timed_out() {
                return if hw.is_busy() {
                    WaitOutcome::TimedOut
                } else {
                    WaitOutcome::Idle
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{NoClock, RegisterBus};
    use crate::regs;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct StatusBus {
        status0: AtomicU32,
    }

    impl RegisterBus for StatusBus {
        fn read(&self, addr: u32) -> u32 {
            if addr == regs::STATUS0 {
                self.status0.load(Ordering::Acquire)
            } else {
                0
            }
        }

        fn write(&self, addr: u32, value: u32) {
            if addr == regs::STATUS0 {
                self.status0.store(value, Ordering::Release);
            }
        }
    }

    fn busy_hardware() -> (Hardware, Arc<StatusBus>) {
        let bus = Arc::new(StatusBus::default());
        bus.write(regs::STATUS0, regs::STATUS0_BUSY);
        (Hardware::new(bus.clone(), Arc::new(NoClock)), bus)
    }

    #[test]
    fn idle_hardware_returns_immediately() {
        let (hw, bus) = busy_hardware();
        bus.write(regs::STATUS0, 0);
        let irq = IrqLine::new();
        let stop = AtomicBool::new(false);
        assert_eq!(
            irq.wait_idle(&hw, Duration::from_secs(5), &stop),
            WaitOutcome::Idle
        );
    }

    #[test]
    fn interrupt_releases_the_wait() {
        let (hw, bus) = busy_hardware();
        let irq = Arc::new(IrqLine::new());
        let isr = {
            let irq = Arc::clone(&irq);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                bus.write(regs::STATUS0, 0);
                irq.raise();
            })
        };
        let stop = AtomicBool::new(false);
        assert_eq!(
            irq.wait_idle(&hw, Duration::from_secs(5), &stop),
            WaitOutcome::Idle
        );
        isr.join().expect("isr thread");
        assert_eq!(irq.count(), 1);
    }

    #[test]
    fn stuck_hardware_times_out() {
        let (hw, _bus) = busy_hardware();
        let irq = IrqLine::new();
        let stop = AtomicBool::new(false);
        assert_eq!(
            irq.wait_idle(&hw, Duration::from_millis(20), &stop),
            WaitOutcome::TimedOut
        );
    }

    #[test]
    fn stop_request_interrupts_the_wait() {
        let (hw, _bus) = busy_hardware();
        let irq = Arc::new(IrqLine::new());
        let stop = Arc::new(AtomicBool::new(false));
        let stopper = {
            let (irq, stop) = (Arc::clone(&irq), Arc::clone(&stop));
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                stop.store(true, Ordering::Release);
                irq.kick();
            })
        };
        assert_eq!(
            irq.wait_idle(&hw, Duration::from_secs(5), &stop),
            WaitOutcome::Stopped
        );
        stopper.join().expect("stopper thread");
        assert_eq!(irq.count(), 0);
    }
}

//! Context registry and dispatcher lifecycle.
//!
//! One [`Manager`] owns one accelerator. Contexts are kept in a round-robin
//! registry; the dispatcher thread claims the first context with pending work,
//! and the registry is rotated so the next search starts just past it.
//!
//! Lock order: registry, then a context's scratch or queue lock.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::hw::{ClockControl, Hardware, RegisterBus};
use crate::irq::IrqLine;
use crate::status::StatusSnapshot;
use crate::worker::{Worker, WorkerState};
use ge2d_queue::{Context, ContextId, Doorbell};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Default)]
struct Registry {
    contexts: VecDeque<Arc<Context>>,
    current: Option<Arc<Context>>,
    last: Option<ContextId>,
    next_id: u32,
}

impl Registry {
    fn select(&mut self) -> Option<Arc<Context>> {
        let index = self.contexts.iter().position(|ctx| ctx.has_work())?;
        let ctx = Arc::clone(&self.contexts[index]);
        self.contexts.rotate_left(index + 1);
        Some(ctx)
    }

    fn is_current(&self, ctx: &Arc<Context>) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, ctx))
    }
}

/// State shared between the manager handle and the dispatcher thread.
pub(crate) struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) hw: Hardware,
    pub(crate) doorbell: Arc<Doorbell>,
    pub(crate) irq: Arc<IrqLine>,
    pub(crate) stop: AtomicBool,
    pub(crate) dispatched: AtomicU64,
    pub(crate) hw_timeouts: AtomicU64,
    registry: Mutex<Registry>,
    state: AtomicU8,
    capture: AtomicBool,
}

impl Shared {
    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn keeps_clock_on(&self) -> bool {
        self.config.keep_clock_on || self.capture.load(Ordering::Acquire)
    }

    /// Selects the next ready context and marks it as executing.
    ///
    /// The flag says whether another context ran on the accelerator since this
    /// one did, in which case every register group must be rewritten.
    pub(crate) fn claim_next(&self) -> Option<(Arc<Context>, bool)> {
        let mut registry = self.registry.lock();
        let ctx = registry.select()?;
        let reconfigure = registry.last != Some(ctx.id());
        registry.current = Some(Arc::clone(&ctx));
        debug!("selected {} (reconfigure: {reconfigure})", ctx.id());
        Some((ctx, reconfigure))
    }

    /// Releases the executing context after a drain pass.
    pub(crate) fn finish_context(&self, ctx: &Arc<Context>) {
        let mut registry = self.registry.lock();
        if registry.is_current(ctx) {
            registry.current = None;
        }
        if ctx.exit_requested() {
            // The accelerator still holds this context's registers.
            registry.last = None;
            ctx.drained().complete();
        } else {
            registry.last = Some(ctx.id());
        }
    }
}

/// Owner of the accelerator: context registry plus dispatcher thread.
pub struct Manager {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Builds a manager over `bus`. The dispatcher is not running until [`Manager::start`].
    pub fn new(
        config: EngineConfig,
        bus: Arc<dyn RegisterBus>,
        clock: Arc<dyn ClockControl>,
    ) -> Self {
        let shared = Shared {
            config,
            hw: Hardware::new(bus, clock),
            doorbell: Arc::new(Doorbell::new()),
            irq: Arc::new(IrqLine::new()),
            stop: AtomicBool::new(false),
            dispatched: AtomicU64::new(0),
            hw_timeouts: AtomicU64::new(0),
            registry: Mutex::new(Registry::default()),
            state: AtomicU8::new(WorkerState::ShuttingDown.to_u8()),
            capture: AtomicBool::new(false),
        };
        Self {
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        }
    }

    /// Configuration the manager was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Interrupt line to hand to the accelerator's interrupt source.
    pub fn irq_line(&self) -> Arc<IrqLine> {
        Arc::clone(&self.shared.irq)
    }

    /// Initialises the accelerator and spawns the dispatcher thread.
    pub fn start(&self) -> EngineResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let hw = &self.shared.hw;
        hw.clock_enable();
        hw.soft_reset();
        hw.init_gen();
        hw.clock_disable();

        self.shared.stop.store(false, Ordering::Release);
        self.shared.set_state(WorkerState::Idle);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.shared.config.worker_name.clone())
            .spawn(move || Worker::new(shared).run())
            .map_err(|err| {
                self.shared.set_state(WorkerState::ShuttingDown);
                EngineError::WorkerSpawn(err)
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stops the dispatcher thread and waits for it to exit.
    ///
    /// A command on the accelerator at that moment is retired without waiting
    /// for its completion.
    pub fn shutdown(&self) -> EngineResult<()> {
        let handle = self.worker.lock().take().ok_or(EngineError::NotRunning)?;
        self.shared.stop.store(true, Ordering::Release);
        self.shared.doorbell.ring();
        self.shared.irq.kick();
        if handle.join().is_err() {
            error!("{} panicked", self.shared.config.worker_name);
        }
        self.shared.set_state(WorkerState::ShuttingDown);
        Ok(())
    }

    /// Whether the dispatcher thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Registers a new context with `slot_capacity` free slots at the registry tail.
    pub fn create_context(&self) -> EngineResult<Arc<Context>> {
        let id = {
            let mut registry = self.shared.registry.lock();
            let id = ContextId(registry.next_id);
            registry.next_id += 1;
            id
        };
        let ctx = Arc::new(Context::new(
            id,
            self.shared.config.slot_capacity,
            Arc::clone(&self.shared.doorbell),
        )?);
        self.shared.registry.lock().contexts.push_back(Arc::clone(&ctx));
        info!("created {id}");
        Ok(ctx)
    }

    /// Detaches `ctx` from the registry and closes it.
    ///
    /// If the dispatcher is draining `ctx`, waits up to `destroy_timeout_ms`
    /// for it to let go; on timeout the wait is abandoned with a warning. The
    /// slots themselves are freed when the last handle drops.
    pub fn destroy_context(&self, ctx: &Arc<Context>) -> EngineResult<()> {
        let executing = {
            let mut registry = self.shared.registry.lock();
            let index = registry
                .contexts
                .iter()
                .position(|entry| Arc::ptr_eq(entry, ctx))
                .ok_or(EngineError::UnknownContext(ctx.id()))?;
            registry.contexts.remove(index);
            if registry.last == Some(ctx.id()) {
                registry.last = None;
            }
            ctx.request_exit();
            registry.is_current(ctx)
        };

        if executing && !ctx.drained().wait_timeout(self.shared.config.destroy_timeout()) {
            warn!("{}: wait timeout", ctx.id());
        }
        ctx.close();
        info!("destroyed {}", ctx.id());
        Ok(())
    }

    /// Picks the next context with pending work and rotates the registry past it.
    ///
    /// This does not mark the context as executing.
    pub fn select_next_ready_context(&self) -> Option<Arc<Context>> {
        self.shared.registry.lock().select()
    }

    /// Context the dispatcher is draining, if any.
    pub fn current_context(&self) -> Option<Arc<Context>> {
        self.shared.registry.lock().current.clone()
    }

    /// Context drained most recently, if it is still registered.
    pub fn last_context(&self) -> Option<ContextId> {
        self.shared.registry.lock().last
    }

    /// Number of registered contexts.
    pub fn context_count(&self) -> usize {
        self.shared.registry.lock().contexts.len()
    }

    /// Turns the output antiflicker filter on or off for every registered context.
    pub fn set_antiflicker(&self, enable: bool) {
        let contexts: Vec<_> = self.shared.registry.lock().contexts.iter().cloned().collect();
        for ctx in contexts {
            ctx.current().dp_gen().antiflick_en = enable;
        }
    }

    /// Keeps the accelerator clock on between passes so registers can be captured.
    pub fn set_register_capture(&self, enable: bool) {
        self.shared.capture.store(enable, Ordering::Release);
    }

    /// Pending commands of the executing context.
    pub fn work_queue_status(&self) -> Option<usize> {
        self.current_context().map(|ctx| ctx.pending())
    }

    /// Free slots of the executing context.
    pub fn free_queue_status(&self) -> Option<usize> {
        self.current_context().map(|ctx| ctx.free())
    }

    /// Run state of the dispatcher thread.
    pub fn worker_state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Commands written to the accelerator so far.
    pub fn dispatched(&self) -> u64 {
        self.shared.dispatched.load(Ordering::Relaxed)
    }

    /// Hardware timeouts recovered by soft reset so far.
    pub fn hw_timeouts(&self) -> u64 {
        self.shared.hw_timeouts.load(Ordering::Relaxed)
    }

    /// Point-in-time view of the manager for diagnostics.
    pub fn status(&self) -> StatusSnapshot {
        let (current, last, contexts) = {
            let registry = self.shared.registry.lock();
            (
                registry.current.clone(),
                registry.last,
                registry.contexts.len(),
            )
        };
        StatusSnapshot {
            state: self.worker_state(),
            current: current.as_ref().map(|ctx| ctx.id().0),
            last: last.map(|id| id.0),
            contexts,
            pending: current.as_ref().map(|ctx| ctx.pending()),
            free: current.as_ref().map(|ctx| ctx.free()),
            dispatched: self.dispatched(),
            hw_timeouts: self.hw_timeouts(),
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.shutdown();
        }
    }
}

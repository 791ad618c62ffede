//! Per-client command queues.
//!
//! A [`Context`] is the unit of submission and scheduling. Clients build the
//! next command in the scratch area returned by [`Context::current`] and queue
//! it with [`Scratch::enqueue`]; the dispatcher takes commands from the head of
//! the work-list with [`Context::begin_dispatch`] and hands the slot back with
//! [`Context::retire`].
//!
//! Lock order is scratch, then queue. The queue lock is only held for list
//! transitions.

use crate::descriptor::{Command, Config, DpGen, DstData, DstGen, Src1Data, Src1Gen, UpdateFlags};
use crate::slot_pool::{SlotId, SlotList, SlotPool};
use crate::wait::{Completion, Doorbell};
use crate::{QueueError, QueueResult};
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifier assigned to a context by its manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

struct ScratchState {
    command: Command,
    config: Config,
}

struct QueueState {
    pool: SlotPool,
    interrupts: u64,
    closed: bool,
}

/// Command taken from the head of a work-list, ready to be written to hardware.
#[derive(Clone, Debug)]
pub struct Dispatch {
    /// Slot that stays at the head of the work-list until retired.
    pub slot: SlotId,
    /// Submission ticket of the slot.
    pub ticket: u64,
    /// Copy of the queued command.
    pub command: Command,
    /// Copy of the register groups captured at enqueue time.
    pub config: Config,
}

/// One client's command queue.
pub struct Context {
    id: ContextId,
    scratch: Mutex<ScratchState>,
    queue: Mutex<QueueState>,
    cmd_complete: Condvar,
    exit_requested: AtomicBool,
    drained: Completion,
    doorbell: Arc<Doorbell>,
}

impl Context {
    /// Creates a context with `capacity` free slots that rings `doorbell` on enqueue.
    pub fn new(id: ContextId, capacity: u32, doorbell: Arc<Doorbell>) -> QueueResult<Self> {
        let pool = SlotPool::new(capacity)?;
        Ok(Self {
            id,
            scratch: Mutex::new(ScratchState {
                command: Command::default(),
                config: Config::default(),
            }),
            queue: Mutex::new(QueueState {
                pool,
                interrupts: 0,
                closed: false,
            }),
            cmd_complete: Condvar::new(),
            exit_requested: AtomicBool::new(false),
            drained: Completion::new(),
            doorbell,
        })
    }

    /// Identifier of this context.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Locks the scratch command and configuration for building the next command.
    ///
    /// The guard serialises submitters sharing this context until it is
    /// enqueued or dropped.
    pub fn current(&self) -> Scratch<'_> {
        Scratch {
            ctx: self,
            guard: self.scratch.lock(),
        }
    }

    /// Queues the scratch command as it currently stands.
    pub fn enqueue_current_command(&self) -> QueueResult<SlotId> {
        self.current().enqueue()
    }

    /// Copies the head of the work-list for dispatch and marks it as hanging on hardware.
    pub fn begin_dispatch(&self) -> Option<Dispatch> {
        let mut queue = self.queue.lock();
        let slot = queue.pool.peek_work()?;
        let entry = queue.pool.slot_mut(slot);
        entry.command.hang = true;
        Some(Dispatch {
            slot,
            ticket: entry.ticket,
            command: entry.command.clone(),
            config: entry.config,
        })
    }

    /// Moves `slot` from the head of the work-list to the tail of the free-list
    /// and wakes blocked submitters if the command was blocking.
    ///
    /// Returns `false` if `slot` is not the head of the work-list.
    pub fn retire(&self, slot: SlotId) -> bool {
        let mut queue = self.queue.lock();
        if queue.pool.peek_work() != Some(slot) {
            warn!("{}: retire of {slot:?} which is not the work-list head", self.id);
            return false;
        }
        let entry = queue.pool.slot_mut(slot);
        let blocking = mem::take(&mut entry.command.wait_done);
        entry.command.hang = false;
        queue.pool.retire(slot);
        drop(queue);

        trace!("{}: retired {slot:?}", self.id);
        if blocking {
            self.cmd_complete.notify_all();
        }
        true
    }

    /// Number of slots in `list`, capped at `capacity + 1`.
    pub fn member_count(&self, list: SlotList) -> u32 {
        self.queue.lock().pool.member_count(list)
    }

    /// Number of commands waiting for dispatch.
    pub fn pending(&self) -> usize {
        self.queue.lock().pool.len(SlotList::Work)
    }

    /// Number of slots available for new commands.
    pub fn free(&self) -> usize {
        self.queue.lock().pool.len(SlotList::Free)
    }

    /// Returns `true` when at least one command waits for dispatch.
    pub fn has_work(&self) -> bool {
        !self.queue.lock().pool.is_empty(SlotList::Work)
    }

    /// Number of slots owned by this context.
    pub fn capacity(&self) -> u32 {
        self.queue.lock().pool.capacity()
    }

    /// Tells the dispatcher to stop draining this context.
    pub fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::Release);
    }

    /// Whether [`Context::request_exit`] has been called.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::Acquire)
    }

    /// Signalled by the dispatcher once it has stopped touching this context after an exit request.
    pub fn drained(&self) -> &Completion {
        &self.drained
    }

    /// Aborts every blocked submitter's wait with [`QueueError::Interrupted`].
    ///
    /// Their commands stay queued and still execute.
    pub fn interrupt_waiters(&self) {
        self.queue.lock().interrupts += 1;
        self.cmd_complete.notify_all();
    }

    /// Rejects further submissions and wakes blocked submitters with [`QueueError::Closed`].
    pub fn close(&self) {
        self.queue.lock().closed = true;
        self.cmd_complete.notify_all();
    }

    /// Whether [`Context::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    fn wait_retired(&self, ticket: u64, generation: u64) -> QueueResult<()> {
        let mut queue = self.queue.lock();
        loop {
            if queue.pool.retired() >= ticket {
                return Ok(());
            }
            if queue.closed {
                return Err(QueueError::Closed);
            }
            if queue.interrupts != generation {
                return Err(QueueError::Interrupted);
            }
            self.cmd_complete.wait(&mut queue);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("pool", &queue.pool)
            .field("closed", &queue.closed)
            .field("exit_requested", &self.exit_requested())
            .finish()
    }
}

/// Exclusive access to a context's scratch command and configuration.
pub struct Scratch<'a> {
    ctx: &'a Context,
    guard: MutexGuard<'a, ScratchState>,
}

impl Scratch<'_> {
    /// The command being built.
    pub fn command(&mut self) -> &mut Command {
        &mut self.guard.command
    }

    /// The configuration that will be captured with the command.
    pub fn config(&mut self) -> &mut Config {
        &mut self.guard.config
    }

    /// Source 1 surface; marks [`UpdateFlags::SRC_DATA`].
    pub fn src1_data(&mut self) -> &mut Src1Data {
        self.guard.config.mark(UpdateFlags::SRC_DATA);
        &mut self.guard.config.src1_data
    }

    /// Source 1 generation; marks [`UpdateFlags::SRC_GEN`].
    pub fn src1_gen(&mut self) -> &mut Src1Gen {
        self.guard.config.mark(UpdateFlags::SRC_GEN);
        &mut self.guard.config.src1_gen
    }

    /// Source 2 and destination surfaces; marks [`UpdateFlags::DST_DATA`].
    pub fn dst_data(&mut self) -> &mut DstData {
        self.guard.config.mark(UpdateFlags::DST_DATA);
        &mut self.guard.config.dst_data
    }

    /// Source 2 and destination generation; marks [`UpdateFlags::DST_GEN`].
    pub fn dst_gen(&mut self) -> &mut DstGen {
        self.guard.config.mark(UpdateFlags::DST_GEN);
        &mut self.guard.config.dst_gen
    }

    /// Data path generation; marks [`UpdateFlags::DP_GEN`].
    pub fn dp_gen(&mut self) -> &mut DpGen {
        self.guard.config.mark(UpdateFlags::DP_GEN);
        &mut self.guard.config.dp_gen
    }

    /// Queues the scratch command at the tail of the work-list.
    ///
    /// The scratch command is reset and the configuration's update flags are
    /// cleared; the rest of the configuration carries over to the next
    /// command. Fails with [`QueueError::NoSpace`] without touching the scratch
    /// area when every slot is in flight. If the command has `wait_done` set,
    /// blocks until the dispatcher retires it.
    pub fn enqueue(self) -> QueueResult<SlotId> {
        let Scratch { ctx, mut guard } = self;
        let (slot, ticket, generation, blocking) = {
            let mut queue = ctx.queue.lock();
            if queue.closed {
                return Err(QueueError::Closed);
            }
            let Some(slot) = queue.pool.try_acquire_free() else {
                let capacity = queue.pool.capacity();
                warn!("{}: work queue no space", ctx.id);
                return Err(QueueError::NoSpace { capacity });
            };

            let scratch = &mut *guard;
            let blocking = scratch.command.wait_done;
            let entry = queue.pool.slot_mut(slot);
            entry.command = mem::take(&mut scratch.command);
            entry.config = scratch.config;
            scratch.config.update = UpdateFlags::empty();
            let ticket = queue.pool.push_work(slot);
            (slot, ticket, queue.interrupts, blocking)
        };
        drop(guard);

        debug!(
            "{}: queued {slot:?} ticket {ticket}{}",
            ctx.id,
            if blocking { " (blocking)" } else { "" }
        );
        ctx.doorbell.ring();

        if blocking {
            ctx.wait_retired(ticket, generation)?;
        }
        Ok(slot)
    }
}

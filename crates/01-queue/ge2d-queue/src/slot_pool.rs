//! Fixed-size command slot pools.
//!
//! Every context owns an arena of preallocated [`CommandSlot`]s and two index
//! queues over it. The free queue tracks slots available for new commands, the
//! work queue holds slots awaiting dispatch in FIFO order. A slot index is in
//! exactly one of the two queues at any time.

use crate::descriptor::{Command, Config};
use crate::{QueueError, QueueResult};
use std::collections::VecDeque;

/// Slots allocated per context unless configured otherwise.
pub const DEFAULT_SLOT_CAPACITY: u32 = 32;

/// Index of a slot inside its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

/// The two queues a slot can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotList {
    /// Slots available for new commands.
    Free,
    /// Slots queued for dispatch.
    Work,
}

/// One queued hardware operation.
#[derive(Clone, Debug, Default)]
pub struct CommandSlot {
    /// Operation parameters.
    pub command: Command,
    /// Register groups captured at enqueue time.
    pub config: Config,
    /// Submission ticket, 0 while the slot is free.
    pub ticket: u64,
}

/// Arena of command slots with free and work index queues.
pub struct SlotPool {
    slots: Vec<CommandSlot>,
    free: VecDeque<SlotId>,
    work: VecDeque<SlotId>,
    next_ticket: u64,
    retired: u64,
}

impl SlotPool {
    /// Allocates `capacity` slots, all of them on the free queue.
    ///
    /// Allocation failures are reported instead of aborting; nothing is left
    /// allocated when this returns an error.
    pub fn new(capacity: u32) -> QueueResult<Self> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity { requested: 0 });
        }
        let len = capacity as usize;
        let failed = |_| QueueError::AllocationFailed { capacity };

        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(failed)?;
        slots.resize_with(len, CommandSlot::default);

        let mut free = VecDeque::new();
        free.try_reserve_exact(len).map_err(failed)?;
        free.extend((0..capacity).map(SlotId));

        let mut work = VecDeque::new();
        work.try_reserve_exact(len).map_err(failed)?;

        Ok(Self {
            slots,
            free,
            work,
            next_ticket: 1,
            retired: 0,
        })
    }

    /// Number of slots managed by the pool.
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Pops the head of the free queue.
    ///
    /// Returns `None` when every slot is queued for dispatch.
    pub fn try_acquire_free(&mut self) -> Option<SlotId> {
        self.free.pop_front()
    }

    /// Appends an acquired slot to the work queue and returns its ticket.
    ///
    /// Tickets start at 1 and increase by one per push, so the work queue is
    /// always sorted by ticket.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn push_work(&mut self, id: SlotId) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.slot_mut(id).ticket = ticket;
        self.work.push_back(id);
        ticket
    }

    /// Head of the work queue without removing it.
    pub fn peek_work(&self) -> Option<SlotId> {
        self.work.front().copied()
    }

    /// Moves `id` from the head of the work queue to the tail of the free queue.
    ///
    /// Returns `false` and changes nothing if `id` is not the head.
    pub fn retire(&mut self, id: SlotId) -> bool {
        if self.work.front() != Some(&id) {
            debug_assert!(false, "retired slot {id:?} is not the work-list head");
            return false;
        }
        self.work.pop_front();
        let ticket = self.slot(id).ticket;
        self.retired = ticket;
        self.slot_mut(id).ticket = 0;
        self.free.push_back(id);
        true
    }

    /// Ticket of the most recently retired slot (0 before the first retire).
    pub fn retired(&self) -> u64 {
        self.retired
    }

    /// Shared access to a slot.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn slot(&self, id: SlotId) -> &CommandSlot {
        assert!(id.0 < self.capacity(), "slot {id:?} out of range");
        &self.slots[id.0 as usize]
    }

    /// Mutable access to a slot.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn slot_mut(&mut self, id: SlotId) -> &mut CommandSlot {
        assert!(id.0 < self.capacity(), "slot {id:?} out of range");
        &mut self.slots[id.0 as usize]
    }

    /// Number of slots currently in `list`.
    pub fn len(&self, list: SlotList) -> usize {
        match list {
            SlotList::Free => self.free.len(),
            SlotList::Work => self.work.len(),
        }
    }

    /// Returns `true` when `list` holds no slot.
    pub fn is_empty(&self, list: SlotList) -> bool {
        self.len(list) == 0
    }

    /// Diagnostic member count, capped at `capacity + 1` so a corrupted queue
    /// shows up as an impossible value instead of an arbitrary one.
    pub fn member_count(&self, list: SlotList) -> u32 {
        let cap = self.capacity() + 1;
        u32::try_from(self.len(list)).map_or(cap, |n| n.min(cap))
    }

    /// Slot ids in `list`, head first.
    pub fn members(&self, list: SlotList) -> impl Iterator<Item = SlotId> + '_ {
        match list {
            SlotList::Free => self.free.iter().copied(),
            SlotList::Work => self.work.iter().copied(),
        }
    }
}

impl std::fmt::Debug for SlotPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotPool")
            .field("capacity", &self.capacity())
            .field("free", &self.free.len())
            .field("work", &self.work.len())
            .field("retired", &self.retired)
            .finish()
    }
}

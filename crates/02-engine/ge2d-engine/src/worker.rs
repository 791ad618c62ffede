//! Dispatcher thread.
//!
//! Idle → Selecting on a doorbell ring, Selecting → Draining for each ready
//! context, Draining → Selecting once the context is empty or asks to exit,
//! Selecting → Idle when nothing is ready. A stop request ends the loop from
//! any state.

use crate::irq::WaitOutcome;
use crate::manager::Shared;
use ge2d_queue::{Context, Dispatch, UpdateFlags};
use log::{debug, error, info};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Run state of the dispatcher thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Parked on the doorbell.
    Idle,
    /// Looking for a context with pending work.
    Selecting,
    /// Feeding one context's commands to the accelerator.
    Draining,
    /// Stopped or never started.
    ShuttingDown,
}

impl WorkerState {
    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Selecting,
            2 => Self::Draining,
            _ => Self::ShuttingDown,
        }
    }
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    fn stopping(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    fn enter(&self, state: WorkerState) {
        self.shared.set_state(state);
    }

    pub(crate) fn run(self) {
        info!("{} started", self.shared.config.worker_name);
        while !self.stopping() {
            self.enter(WorkerState::Idle);
            self.shared.doorbell.wait();
            if self.stopping() {
                break;
            }

            self.shared.hw.clock_enable();
            self.enter(WorkerState::Selecting);
            while let Some((ctx, reconfigure)) = self.shared.claim_next() {
                self.enter(WorkerState::Draining);
                self.drain(&ctx, reconfigure);
                self.shared.finish_context(&ctx);
                if self.stopping() {
                    break;
                }
                self.enter(WorkerState::Selecting);
            }
            if !self.shared.keeps_clock_on() {
                self.shared.hw.clock_disable();
            }
        }
        self.enter(WorkerState::ShuttingDown);
        info!("{} stopped", self.shared.config.worker_name);
    }

    fn drain(&self, ctx: &Context, reconfigure: bool) {
        let shared = &self.shared;
        let mut force_all = reconfigure;
        loop {
            if ctx.exit_requested() || self.stopping() {
                debug!("{}: leaving drain early", ctx.id());
                break;
            }
            let Some(dispatch) = ctx.begin_dispatch() else {
                break;
            };

            let groups = if force_all {
                UpdateFlags::all()
            } else {
                dispatch.config.update
            };
            force_all = false;
            debug!(
                "{}: dispatch {:?} ticket {} groups {groups:?}",
                ctx.id(),
                dispatch.slot,
                dispatch.ticket
            );
            shared.hw.apply_config(&dispatch.config, groups);
            shared.hw.start(&dispatch.command);
            shared.dispatched.fetch_add(1, Ordering::Relaxed);

            match shared
                .irq
                .wait_idle(&shared.hw, shared.config.hw_timeout(), &shared.stop)
            {
                WaitOutcome::Idle => {}
                WaitOutcome::TimedOut => {
                    error!("{}: ge2d timeout", ctx.id());
                    self.dump(&dispatch);
                    shared.hw.soft_reset();
                    shared.hw_timeouts.fetch_add(1, Ordering::Relaxed);
                }
                WaitOutcome::Stopped => {
                    debug!("{}: stop requested while hardware busy", ctx.id());
                    shared.hw.soft_reset();
                }
            }
            ctx.retire(dispatch.slot);
        }
    }

    fn dump(&self, dispatch: &Dispatch) {
        let cmd = &dispatch.command;
        let (status0, status1) = self.shared.hw.status();
        debug!("slot {:?} ticket {}", dispatch.slot, dispatch.ticket);
        debug!(
            "src1 {:?} fill {} cmult {}",
            cmd.src1, cmd.src1_fill_color_en, cmd.src1_cmult_asel
        );
        debug!(
            "src2 {:?} fill {} cmult {}",
            cmd.src2, cmd.src2_fill_color_en, cmd.src2_cmult_asel
        );
        debug!("dst {:?} xy_swap {}", cmd.dst, cmd.dst_xy_swap);
        debug!("scale {:?}", cmd.scale);
        debug!("color_blend {:?}", cmd.color_blend);
        debug!("alpha_blend {:?}", cmd.alpha_blend);
        debug!("wait_done {} hang {}", cmd.wait_done, cmd.hang);
        debug!("STATUS0 {status0:#010x} STATUS1 {status1:#010x}");
    }
}

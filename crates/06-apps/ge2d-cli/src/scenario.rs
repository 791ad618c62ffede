//! Workloads run against a simulated accelerator.
//!
//! Every fill is tagged with its context id as the fill colour, so the
//! accelerator's dispatch log tells which context each command came from.

use anyhow::{anyhow, bail, Context as _, Result};
use ge2d_engine::StatusSnapshot;
use ge2d_gen::{fill_rect, fill_rect_noblk, GenError};
use ge2d_queue::{Context, QueueError, Rect};
use ge2d_sim::{SimRig, SimStats};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_micros(200);

/// Outcome of one scenario.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub scenario: &'static str,
    pub submitted: u64,
    /// Submissions refused with "no space" (retried in flood runs).
    pub rejected: u64,
    pub elapsed_ms: u64,
    /// Longest blocking submission, when the scenario blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_us: Option<u64>,
    /// Consecutive commands served per context, in dispatch order.
    pub service: Vec<Run>,
    pub sim: SimStats,
    pub status: StatusSnapshot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Run {
    pub context: u32,
    pub commands: usize,
}

/// Several submitter threads, one per context, each retrying on backpressure.
pub fn flood(rig: &SimRig, contexts: u32, commands: u32) -> Result<Report> {
    let started = Instant::now();
    rig.manager.start().context("starting dispatcher")?;
    let ctxs = create_contexts(rig, contexts)?;

    let submitters: Vec<_> = ctxs
        .iter()
        .map(|ctx| {
            let ctx = Arc::clone(ctx);
            thread::spawn(move || -> Result<u64> {
                let mut rejected = 0;
                for i in 0..commands {
                    rejected += submit_retrying(&ctx, i)?;
                }
                Ok(rejected)
            })
        })
        .collect();

    let mut rejected = 0;
    for handle in submitters {
        rejected += handle
            .join()
            .map_err(|_| anyhow!("submitter thread panicked"))??;
    }
    wait_drained(rig, &ctxs)?;

    let submitted = u64::from(contexts) * u64::from(commands);
    finish(rig, "flood", started, submitted, rejected, None)
}

/// Queues a batch in every context before the dispatcher starts, then lets it
/// serve them.
pub fn fairness(rig: &SimRig, contexts: u32, commands: u32) -> Result<Report> {
    let capacity = rig.manager.config().slot_capacity;
    if commands > capacity {
        bail!("{commands} commands per context exceed the slot capacity of {capacity}");
    }
    let started = Instant::now();
    let ctxs = create_contexts(rig, contexts)?;
    for ctx in &ctxs {
        for i in 0..commands {
            fill_rect_noblk(ctx, tile(i), ctx.id().0)
                .with_context(|| format!("queueing on {}", ctx.id()))?;
        }
    }
    rig.manager.start().context("starting dispatcher")?;
    wait_drained(rig, &ctxs)?;

    let submitted = u64::from(contexts) * u64::from(commands);
    finish(rig, "fairness", started, submitted, 0, None)
}

/// Overfills one context while the dispatcher is stopped, then checks the
/// freed slots accept work again.
pub fn backpressure(rig: &SimRig, extra: u32) -> Result<Report> {
    let started = Instant::now();
    let ctx = rig.manager.create_context().context("creating context")?;
    let mut accepted = 0;
    let mut rejected = 0;
    for i in 0..ctx.capacity() + extra {
        match fill_rect_noblk(&ctx, tile(i), ctx.id().0) {
            Ok(()) => accepted += 1,
            Err(GenError::Queue(QueueError::NoSpace { .. })) => rejected += 1,
            Err(err) => return Err(err).context("queueing"),
        }
    }
    info!("{}: accepted {accepted}, rejected {rejected}", ctx.id());
    if accepted != u64::from(ctx.capacity()) {
        bail!("accepted {accepted} commands into {} slots", ctx.capacity());
    }

    rig.manager.start().context("starting dispatcher")?;
    let ctxs = [ctx];
    wait_drained(rig, &ctxs)?;
    fill_rect(&ctxs[0], tile(0), ctxs[0].id().0).context("submitting after drain")?;

    finish(rig, "backpressure", started, accepted + 1, rejected, None)
}

/// Blocking submissions from a single context.
pub fn blocking(rig: &SimRig, commands: u32) -> Result<Report> {
    let started = Instant::now();
    rig.manager.start().context("starting dispatcher")?;
    let ctx = rig.manager.create_context().context("creating context")?;
    let max_wait = blocking_fills(&ctx, commands)?;
    finish(
        rig,
        "blocking",
        started,
        u64::from(commands),
        0,
        Some(max_wait),
    )
}

/// Blocking submissions with the first `hangs` commands never completing.
pub fn hang(rig: &SimRig, hangs: u32, commands: u32) -> Result<Report> {
    let started = Instant::now();
    rig.accel.hang_next(hangs);
    rig.manager.start().context("starting dispatcher")?;
    let ctx = rig.manager.create_context().context("creating context")?;
    let max_wait = blocking_fills(&ctx, commands)?;

    let timeouts = rig.manager.hw_timeouts();
    if timeouts != u64::from(hangs.min(commands)) {
        bail!("expected {} hardware timeouts, saw {timeouts}", hangs.min(commands));
    }
    finish(rig, "hang", started, u64::from(commands), 0, Some(max_wait))
}

fn create_contexts(rig: &SimRig, count: u32) -> Result<Vec<Arc<Context>>> {
    (0..count)
        .map(|_| rig.manager.create_context().context("creating context"))
        .collect()
}

fn tile(i: u32) -> Rect {
    let col = (i % 64) as i32;
    let row = (i / 64 % 64) as i32;
    Rect::new(col * 16, row * 16, 16, 16)
}

/// Returns how many times the submission was refused before it fit.
fn submit_retrying(ctx: &Context, i: u32) -> Result<u64> {
    let mut rejected = 0;
    loop {
        match fill_rect_noblk(ctx, tile(i), ctx.id().0) {
            Ok(()) => return Ok(rejected),
            Err(GenError::Queue(QueueError::NoSpace { .. })) => {
                rejected += 1;
                thread::sleep(RETRY_BACKOFF);
            }
            Err(err) => return Err(err).with_context(|| format!("queueing on {}", ctx.id())),
        }
    }
}

/// Returns the longest wait in microseconds.
fn blocking_fills(ctx: &Context, commands: u32) -> Result<u64> {
    let mut max_wait = Duration::ZERO;
    for i in 0..commands {
        let begun = Instant::now();
        fill_rect(ctx, tile(i), ctx.id().0).with_context(|| format!("blocking fill {i}"))?;
        max_wait = max_wait.max(begun.elapsed());
        if ctx.pending() != 0 {
            bail!("blocking fill {i} returned with {} commands pending", ctx.pending());
        }
    }
    Ok(max_wait.as_micros() as u64)
}

fn wait_drained(rig: &SimRig, ctxs: &[Arc<Context>]) -> Result<()> {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        let idle = ctxs.iter().all(|ctx| ctx.pending() == 0)
            && rig.manager.current_context().is_none()
            && !rig.accel.is_busy();
        if idle {
            return Ok(());
        }
        if Instant::now() >= deadline {
            let pending: usize = ctxs.iter().map(|ctx| ctx.pending()).sum();
            bail!("work queues not drained after {DRAIN_TIMEOUT:?} ({pending} pending)");
        }
        thread::sleep(Duration::from_millis(1));
    }
}

fn service_runs(rig: &SimRig) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for record in rig.accel.dispatch_log() {
        match runs.last_mut() {
            Some(run) if run.context == record.src1_color => run.commands += 1,
            _ => runs.push(Run {
                context: record.src1_color,
                commands: 1,
            }),
        }
    }
    runs
}

fn finish(
    rig: &SimRig,
    scenario: &'static str,
    started: Instant,
    submitted: u64,
    rejected: u64,
    max_wait_us: Option<u64>,
) -> Result<Report> {
    let report = Report {
        scenario,
        submitted,
        rejected,
        elapsed_ms: started.elapsed().as_millis() as u64,
        max_wait_us,
        service: service_runs(rig),
        sim: rig.accel.stats(),
        status: rig.manager.status(),
    };
    rig.manager.shutdown().context("stopping dispatcher")?;
    debug!("{scenario}: {report:?}");
    Ok(report)
}

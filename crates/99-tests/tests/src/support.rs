use ge2d_engine::{EngineConfig, WorkerState};
use ge2d_queue::{Context, Rect};
use ge2d_sim::{SimConfig, SimRig};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEADLINE: Duration = Duration::from_secs(10);

pub fn engine(slot_capacity: u32) -> EngineConfig {
    EngineConfig {
        slot_capacity,
        ..EngineConfig::default()
    }
}

pub fn sim(latency_us: u64) -> SimConfig {
    SimConfig {
        latency_us,
        ..SimConfig::default()
    }
}

pub fn rig(engine: EngineConfig, sim: SimConfig) -> SimRig {
    let _ = env_logger::builder().is_test(true).try_init();
    SimRig::new(engine, &sim).expect("sim rig")
}

pub fn tile(i: u32) -> Rect {
    Rect::new((i % 32) as i32 * 8, (i / 32) as i32 * 8, 8, 8)
}

pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Waits until every queue is empty and the dispatcher has parked again.
pub fn wait_drained(rig: &SimRig, ctxs: &[Arc<Context>]) {
    let drained = wait_until(|| {
        ctxs.iter().all(|ctx| ctx.pending() == 0)
            && rig.manager.current_context().is_none()
            && rig.manager.worker_state() == WorkerState::Idle
    });
    assert!(drained, "work queues did not drain");
}

/// Fill colours in dispatch order; tests tag each fill through its colour.
pub fn colors(rig: &SimRig) -> Vec<u32> {
    rig.accel
        .dispatch_log()
        .iter()
        .map(|record| record.src1_color)
        .collect()
}

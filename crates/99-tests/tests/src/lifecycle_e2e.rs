#![cfg(test)]

use crate::support::{engine, rig, sim, tile, wait_drained, wait_until};
use ge2d_engine::{EngineConfig, EngineError};
use ge2d_gen::{fill_rect, fill_rect_noblk, GenError};
use ge2d_queue::QueueError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn hung_command_is_recovered_by_soft_reset() {
    let rig = rig(
        EngineConfig {
            hw_timeout_ms: 50,
            ..engine(4)
        },
        sim(50),
    );
    rig.accel.hang_next(1);
    let ctx = rig.manager.create_context().expect("context");
    rig.manager.start().expect("start");

    fill_rect(&ctx, tile(0), 1).expect("hung fill still retires");
    assert_eq!(rig.manager.hw_timeouts(), 1);
    fill_rect(&ctx, tile(1), 2).expect("accelerator usable again");

    let stats = rig.accel.stats();
    assert_eq!(stats.hangs, 1);
    assert_eq!(stats.completed, 1);
    // One reset when the manager starts, one to recover.
    assert_eq!(stats.resets, 2);
    assert_eq!(ctx.free(), 4);
}

#[test]
fn destroying_the_executing_context_waits_for_the_dispatcher() {
    let rig = rig(
        EngineConfig {
            destroy_timeout_ms: 5_000,
            ..engine(8)
        },
        sim(20_000),
    );
    let ctx = rig.manager.create_context().expect("context");
    for i in 0..8 {
        fill_rect_noblk(&ctx, tile(i), i).expect("queue");
    }
    rig.manager.start().expect("start");
    assert!(wait_until(|| rig.manager.dispatched() >= 1));

    let begun = Instant::now();
    rig.manager.destroy_context(&ctx).expect("destroy");
    assert!(begun.elapsed() < Duration::from_secs(5), "destroy hit its timeout");

    assert!(rig.manager.current_context().is_none());
    assert_eq!(rig.manager.context_count(), 0);
    assert_eq!(rig.manager.last_context(), None);
    assert!(rig.manager.dispatched() < 8, "drain stopped early");
    assert!(ctx.is_closed());
    assert_eq!(
        fill_rect_noblk(&ctx, tile(0), 0),
        Err(GenError::Queue(QueueError::Closed))
    );
}

#[test]
fn destroy_wakes_a_blocked_submitter() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");

    // The dispatcher is not running, so the blocking fill never retires.
    let submitter = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || fill_rect(&ctx, tile(0), 0))
    };
    assert!(wait_until(|| ctx.pending() == 1));
    rig.manager.destroy_context(&ctx).expect("destroy");

    assert_eq!(
        submitter.join().expect("submitter"),
        Err(GenError::Queue(QueueError::Closed))
    );
}

#[test]
fn interrupted_submitter_leaves_its_command_queued() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");

    let submitter = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || fill_rect(&ctx, tile(0), 7))
    };
    assert!(wait_until(|| ctx.pending() == 1));
    ctx.interrupt_waiters();
    assert_eq!(
        submitter.join().expect("submitter"),
        Err(GenError::Queue(QueueError::Interrupted))
    );

    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);
    assert_eq!(rig.accel.dispatch_log()[0].src1_color, 7);
}

#[test]
fn shutdown_retires_the_command_on_hardware() {
    let rig = rig(
        EngineConfig {
            hw_timeout_ms: 60_000,
            ..engine(4)
        },
        sim(50),
    );
    rig.accel.hang_next(1);
    let ctx = rig.manager.create_context().expect("context");
    fill_rect_noblk(&ctx, tile(0), 0).expect("queue");
    rig.manager.start().expect("start");
    assert!(wait_until(|| rig.manager.dispatched() == 1));

    let begun = Instant::now();
    rig.manager.shutdown().expect("shutdown");
    assert!(begun.elapsed() < Duration::from_secs(5));
    assert!(!rig.manager.is_running());
    assert_eq!(ctx.pending(), 0);
    assert_eq!(rig.manager.hw_timeouts(), 0);
}

#[test]
fn destroying_twice_reports_an_unknown_context() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    rig.manager.destroy_context(&ctx).expect("first destroy");
    assert!(matches!(
        rig.manager.destroy_context(&ctx),
        Err(EngineError::UnknownContext(id)) if id == ctx.id()
    ));
}

#[test]
fn zero_slot_contexts_are_rejected() {
    let rig = rig(engine(0), sim(50));
    assert!(matches!(
        rig.manager.create_context(),
        Err(EngineError::Queue(QueueError::InvalidCapacity { requested: 0 }))
    ));
    assert_eq!(rig.manager.context_count(), 0);
}

#[test]
fn starting_twice_is_refused() {
    let rig = rig(engine(4), sim(50));
    rig.manager.start().expect("start");
    assert!(matches!(
        rig.manager.start(),
        Err(EngineError::AlreadyRunning)
    ));
    rig.manager.shutdown().expect("shutdown");
    assert!(matches!(
        rig.manager.shutdown(),
        Err(EngineError::NotRunning)
    ));
}

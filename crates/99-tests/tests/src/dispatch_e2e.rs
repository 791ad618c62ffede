#![cfg(test)]

use crate::support::{colors, engine, rig, sim, tile, wait_drained, wait_until};
use ge2d_gen::{fill_rect, fill_rect_noblk, GenError};
use ge2d_queue::{QueueError, SlotList, UpdateFlags};
use std::sync::Arc;
use std::thread;

#[test]
fn commands_of_one_context_run_in_submission_order() {
    let rig = rig(engine(8), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    for i in 0..8 {
        fill_rect_noblk(&ctx, tile(i), 100 + i).expect("queue");
    }
    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);

    assert_eq!(colors(&rig), (100..108).collect::<Vec<_>>());
    assert_eq!(rig.manager.dispatched(), 8);
}

#[test]
fn ready_contexts_are_served_round_robin() {
    let rig = rig(engine(4), sim(50));
    let ctxs: Vec<_> = (0..3)
        .map(|_| rig.manager.create_context().expect("context"))
        .collect();
    // Queue back to front so service order is not submission order.
    for ctx in ctxs.iter().rev() {
        for i in 0..4 {
            fill_rect_noblk(ctx, tile(i), ctx.id().0).expect("queue");
        }
    }
    rig.manager.start().expect("start");
    wait_drained(&rig, &ctxs);

    let expected: Vec<u32> = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2].to_vec();
    assert_eq!(colors(&rig), expected);
}

#[test]
fn context_switch_rewrites_every_register_group() {
    let rig = rig(engine(4), sim(50));
    let a = rig.manager.create_context().expect("context a");
    let b = rig.manager.create_context().expect("context b");
    for ctx in [&a, &b] {
        fill_rect_noblk(ctx, tile(0), 1).expect("first");
        fill_rect_noblk(ctx, tile(1), 2).expect("second");
    }
    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&a), Arc::clone(&b)]);

    let groups: Vec<_> = rig
        .accel
        .dispatch_log()
        .iter()
        .map(|record| record.groups)
        .collect();
    assert_eq!(
        groups,
        [
            UpdateFlags::all(),
            UpdateFlags::SRC_DATA,
            UpdateFlags::all(),
            UpdateFlags::SRC_DATA,
        ]
    );
}

#[test]
fn same_context_on_a_later_pass_keeps_its_registers() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    rig.manager.start().expect("start");

    fill_rect(&ctx, tile(0), 1).expect("first pass");
    wait_drained(&rig, &[Arc::clone(&ctx)]);
    fill_rect(&ctx, tile(1), 2).expect("second pass");

    let log = rig.accel.dispatch_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].groups, UpdateFlags::all());
    assert_eq!(log[1].groups, UpdateFlags::SRC_DATA);
    assert_eq!(rig.manager.last_context(), Some(ctx.id()));
}

#[test]
fn full_queue_refuses_until_a_slot_retires() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    for i in 0..4 {
        fill_rect_noblk(&ctx, tile(i), i).expect("fits");
    }
    assert_eq!(
        fill_rect_noblk(&ctx, tile(4), 4),
        Err(GenError::Queue(QueueError::NoSpace { capacity: 4 }))
    );
    assert_eq!(ctx.pending(), 4);

    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);
    fill_rect_noblk(&ctx, tile(4), 4).expect("slot recycled");
    wait_drained(&rig, &[Arc::clone(&ctx)]);

    assert_eq!(colors(&rig), [0, 1, 2, 3, 4]);
    assert_eq!(ctx.free(), 4);
}

#[test]
fn blocking_submit_returns_after_retirement() {
    let rig = rig(engine(4), sim(2_000));
    let ctx = rig.manager.create_context().expect("context");
    rig.manager.start().expect("start");

    for i in 0..5 {
        fill_rect(&ctx, tile(i), i).expect("blocking fill");
        assert_eq!(ctx.pending(), 0);
        assert_eq!(rig.accel.stats().completed, u64::from(i) + 1);
    }
}

#[test]
fn concurrent_submitters_lose_no_slots() {
    const PER_CONTEXT: u32 = 200;
    let rig = rig(engine(4), sim(20));
    rig.manager.start().expect("start");
    let ctxs: Vec<_> = (0..4)
        .map(|_| rig.manager.create_context().expect("context"))
        .collect();

    let submitters: Vec<_> = ctxs
        .iter()
        .map(|ctx| {
            let ctx = Arc::clone(ctx);
            thread::spawn(move || {
                for i in 0..PER_CONTEXT {
                    loop {
                        match fill_rect_noblk(&ctx, tile(i), ctx.id().0) {
                            Ok(()) => break,
                            Err(GenError::Queue(QueueError::NoSpace { .. })) => {
                                thread::yield_now()
                            }
                            Err(err) => panic!("unexpected submit error: {err}"),
                        }
                    }
                }
            })
        })
        .collect();
    for handle in submitters {
        handle.join().expect("submitter");
    }
    wait_drained(&rig, &ctxs);

    assert_eq!(rig.manager.dispatched(), u64::from(PER_CONTEXT) * 4);
    assert_eq!(rig.accel.stats().completed, u64::from(PER_CONTEXT) * 4);
    for ctx in &ctxs {
        assert_eq!(ctx.member_count(SlotList::Free), 4);
        assert_eq!(ctx.member_count(SlotList::Work), 0);
        let served = colors(&rig)
            .into_iter()
            .filter(|&color| color == ctx.id().0)
            .count();
        assert_eq!(served, PER_CONTEXT as usize);
    }
}

#[test]
fn clock_is_gated_between_passes() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    for i in 0..3 {
        fill_rect_noblk(&ctx, tile(i), i).expect("queue");
    }
    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);

    assert!(wait_until(|| !rig.clock.is_enabled()));
    assert_eq!(rig.accel.stats().gated_writes, 0);
    assert_eq!(rig.clock.enables(), rig.clock.disables());
}

#[test]
fn register_capture_keeps_the_clock_running() {
    let rig = rig(engine(4), sim(50));
    rig.manager.set_register_capture(true);
    let ctx = rig.manager.create_context().expect("context");
    fill_rect_noblk(&ctx, tile(0), 0).expect("queue");
    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);

    assert!(rig.clock.is_enabled());
    assert_eq!(rig.accel.stats().gated_writes, 0);
}

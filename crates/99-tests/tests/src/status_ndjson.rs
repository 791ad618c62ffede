#![cfg(test)]

use crate::support::{engine, rig, sim, tile, wait_drained};
use ge2d_gen::fill_rect_noblk;
use serde_json::{json, Value};
use std::sync::Arc;

#[test]
fn status_snapshot_serialises_after_a_drain() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    for i in 0..3 {
        fill_rect_noblk(&ctx, tile(i), i).expect("queue");
    }
    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);

    let status = serde_json::to_value(rig.manager.status()).expect("status json");
    assert_eq!(
        status,
        json!({
            "state": "idle",
            "current": null,
            "last": ctx.id().0,
            "contexts": 1,
            "pending": null,
            "free": null,
            "dispatched": 3,
            "hw_timeouts": 0,
        })
    );
}

#[test]
fn reports_stream_as_one_object_per_line() {
    let rig = rig(engine(4), sim(50));
    let ctx = rig.manager.create_context().expect("context");
    fill_rect_noblk(&ctx, tile(0), 0).expect("queue");

    let before = serde_json::to_string(&rig.manager.status()).expect("before");
    rig.manager.start().expect("start");
    wait_drained(&rig, &[Arc::clone(&ctx)]);
    let after = serde_json::to_string(&rig.accel.stats()).expect("after");

    let stream = format!("{before}\n{after}\n");
    let lines: Vec<Value> = stream
        .lines()
        .map(|line| serde_json::from_str(line).expect("ndjson line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["state"], "shutting_down");
    assert_eq!(lines[0]["contexts"], 1);
    assert_eq!(lines[1]["completed"], 1);
    assert_eq!(lines[1]["gated_writes"], 0);
}

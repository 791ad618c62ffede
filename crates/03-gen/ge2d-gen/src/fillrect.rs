use crate::{queue, GenResult};
use ge2d_queue::{BlendEquation, Context, LogicOp, Rect, Scratch};

fn build(scratch: &mut Scratch<'_>, rect: Rect, color: u32) {
    scratch.src1_data().def_color = color;
    let cmd = scratch.command();
    let window = rect.window();
    cmd.src1 = window;
    cmd.src1_fill_color_en = true;
    cmd.src2 = window;
    cmd.dst = window;
    cmd.color_blend = BlendEquation::logic(LogicOp::Copy);
    cmd.alpha_blend = BlendEquation::logic(LogicOp::Copy);
}

/// Fills `rect` of the destination with `color` and waits for completion.
pub fn fill_rect(ctx: &Context, rect: Rect, color: u32) -> GenResult<()> {
    queue(ctx, true, |s| build(s, rect, color))
}

/// Queues a fill of `rect` with `color` without waiting.
pub fn fill_rect_noblk(ctx: &Context, rect: Rect, color: u32) -> GenResult<()> {
    queue(ctx, false, |s| build(s, rect, color))
}

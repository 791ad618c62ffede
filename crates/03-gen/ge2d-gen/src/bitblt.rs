use crate::{force_opaque, queue, GenResult};
use ge2d_queue::{BlendEquation, Context, LogicOp, Rect, Scratch};

fn build(scratch: &mut Scratch<'_>, src: Rect, dst_x: i32, dst_y: i32, opaque: bool) {
    let dst = Rect::new(dst_x, dst_y, src.w, src.h).window();
    let cmd = scratch.command();
    cmd.src1 = src.window();
    cmd.src2 = dst;
    cmd.dst = dst;
    cmd.color_blend = BlendEquation::logic(LogicOp::Copy);
    cmd.alpha_blend = BlendEquation::logic(LogicOp::Copy);
    if opaque {
        force_opaque(scratch);
    }
}

/// Copies `src` to `(dst_x, dst_y)` and waits for completion.
pub fn bitblt(ctx: &Context, src: Rect, dst_x: i32, dst_y: i32) -> GenResult<()> {
    queue(ctx, true, |s| build(s, src, dst_x, dst_y, false))
}

/// Queues a copy of `src` to `(dst_x, dst_y)` without waiting.
pub fn bitblt_noblk(ctx: &Context, src: Rect, dst_x: i32, dst_y: i32) -> GenResult<()> {
    queue(ctx, false, |s| build(s, src, dst_x, dst_y, false))
}

/// Copies `src` to `(dst_x, dst_y)` writing opaque alpha, and waits for completion.
pub fn bitblt_noalpha(ctx: &Context, src: Rect, dst_x: i32, dst_y: i32) -> GenResult<()> {
    queue(ctx, true, |s| build(s, src, dst_x, dst_y, true))
}

/// Queues an opaque copy of `src` to `(dst_x, dst_y)` without waiting.
pub fn bitblt_noalpha_noblk(ctx: &Context, src: Rect, dst_x: i32, dst_y: i32) -> GenResult<()> {
    queue(ctx, false, |s| build(s, src, dst_x, dst_y, true))
}

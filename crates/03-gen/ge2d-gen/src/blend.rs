use crate::blendop::BlendOp;
use crate::stretchblt::{check_target, scale_params};
use crate::{force_opaque, queue, GenResult};
use ge2d_queue::{Context, Rect, Scratch};

fn build(scratch: &mut Scratch<'_>, src1: Rect, src2: Rect, dst: Rect, op: BlendOp, opaque: bool) {
    let cmd = scratch.command();
    cmd.src1 = src1.window();
    cmd.src2 = src2.window();
    cmd.dst = dst.window();
    if (src1.w, src1.h) != (dst.w, dst.h) {
        cmd.scale = scale_params(src1, dst);
    }
    cmd.color_blend = op.color();
    cmd.alpha_blend = op.alpha();
    if opaque {
        force_opaque(scratch);
    }
}

fn run(
    ctx: &Context,
    rects: (Rect, Rect, Rect),
    op: BlendOp,
    opaque: bool,
    blocking: bool,
) -> GenResult<()> {
    let (src1, src2, dst) = rects;
    check_target(dst)?;
    queue(ctx, blocking, |s| build(s, src1, src2, dst, op, opaque))
}

/// Blends `src1` over `src2` into `dst` with `op` and waits for completion.
pub fn blend(ctx: &Context, src1: Rect, src2: Rect, dst: Rect, op: BlendOp) -> GenResult<()> {
    run(ctx, (src1, src2, dst), op, false, true)
}

/// Queues a blend of `src1` over `src2` into `dst` without waiting.
pub fn blend_noblk(
    ctx: &Context,
    src1: Rect,
    src2: Rect,
    dst: Rect,
    op: BlendOp,
) -> GenResult<()> {
    run(ctx, (src1, src2, dst), op, false, false)
}

/// Blends with `op`'s colour equation and writes opaque alpha; waits for completion.
pub fn blend_noalpha(
    ctx: &Context,
    src1: Rect,
    src2: Rect,
    dst: Rect,
    op: BlendOp,
) -> GenResult<()> {
    run(ctx, (src1, src2, dst), op, true, true)
}

/// Queues a blend that writes opaque alpha without waiting.
pub fn blend_noalpha_noblk(
    ctx: &Context,
    src1: Rect,
    src2: Rect,
    dst: Rect,
    op: BlendOp,
) -> GenResult<()> {
    run(ctx, (src1, src2, dst), op, true, false)
}

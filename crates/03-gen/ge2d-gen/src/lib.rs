#![deny(missing_docs)]
//! Drawing-command builders for the GE2D work-queue engine.
//!
//! Each builder fills the scratch command (and, where needed, scratch
//! configuration) of a [`Context`] and queues it. Plain names wait for the
//! command to retire; `_noblk` variants return as soon as it is queued.
//! `_noalpha` variants write fully opaque alpha instead of blending it.

mod bitblt;
mod blend;
pub mod blendop;
mod error;
mod fillrect;
pub mod format;
mod stretchblt;
mod surface;

pub use bitblt::{bitblt, bitblt_noalpha, bitblt_noalpha_noblk, bitblt_noblk};
pub use blend::{blend, blend_noalpha, blend_noalpha_noblk, blend_noblk};
pub use blendop::BlendOp;
pub use error::{GenError, GenResult};
pub use fillrect::{fill_rect, fill_rect_noblk};
pub use format::PixelFormat;
pub use stretchblt::{stretchblt, stretchblt_noalpha, stretchblt_noalpha_noblk, stretchblt_noblk};
pub use surface::{configure, Surface, SurfaceConfig};

use ge2d_queue::{
    BlendEquation, Command, Context, FilterType, LogicOp, Rect, Scratch, UpdateFlags,
};
use log::trace;

fn queue(ctx: &Context, blocking: bool, build: impl FnOnce(&mut Scratch<'_>)) -> GenResult<()> {
    let mut scratch = ctx.current();
    // A refused enqueue leaves its command behind; the configuration carries over.
    *scratch.command() = Command::default();
    build(&mut scratch);
    scratch.command().wait_done = blocking;
    let slot = scratch.enqueue()?;
    trace!("{}: built command in {slot:?}", ctx.id());
    Ok(())
}

/// Replaces the alpha equation with "write constant 0xff".
fn force_opaque(scratch: &mut Scratch<'_>) {
    let dp = scratch.dp_gen();
    dp.alu_const_color = (dp.alu_const_color & !0xff) | 0xff;
    scratch.command().alpha_blend = BlendEquation::logic(LogicOp::Set);
}

/// Selects the scaler filter kernels used by subsequent commands.
pub fn set_scale_coef(ctx: &Context, v_filter: FilterType, h_filter: FilterType) {
    let mut scratch = ctx.current();
    let config = scratch.config();
    config.v_filter = v_filter;
    config.h_filter = h_filter;
    config.mark(UpdateFlags::SCALE_COEF);
}

/// Fills `rect` with `color`.
pub fn submit_fill(ctx: &Context, rect: Rect, color: u32, blocking: bool) -> GenResult<()> {
    if blocking {
        fill_rect(ctx, rect, color)
    } else {
        fill_rect_noblk(ctx, rect, color)
    }
}

/// Copies `src` so its origin lands on `dst_origin`.
pub fn submit_blit(
    ctx: &Context,
    src: Rect,
    dst_origin: (i32, i32),
    blocking: bool,
) -> GenResult<()> {
    let (x, y) = dst_origin;
    if blocking {
        bitblt(ctx, src, x, y)
    } else {
        bitblt_noblk(ctx, src, x, y)
    }
}

/// Scales `src` onto `dst`.
pub fn submit_stretch_blit(ctx: &Context, src: Rect, dst: Rect, blocking: bool) -> GenResult<()> {
    if blocking {
        stretchblt(ctx, src, dst)
    } else {
        stretchblt_noblk(ctx, src, dst)
    }
}

/// Blends `src1` with `src2` into `dst` using `op`.
pub fn submit_blend(
    ctx: &Context,
    src1: Rect,
    src2: Rect,
    dst: Rect,
    op: BlendOp,
    blocking: bool,
) -> GenResult<()> {
    if blocking {
        blend(ctx, src1, src2, dst, op)
    } else {
        blend_noblk(ctx, src1, src2, dst, op)
    }
}

/// Blends `src1` with `src2` into `dst` using `op`, writing opaque alpha.
pub fn submit_blend_noalpha(
    ctx: &Context,
    src1: Rect,
    src2: Rect,
    dst: Rect,
    op: BlendOp,
    blocking: bool,
) -> GenResult<()> {
    if blocking {
        blend_noalpha(ctx, src1, src2, dst, op)
    } else {
        blend_noalpha_noblk(ctx, src1, src2, dst, op)
    }
}

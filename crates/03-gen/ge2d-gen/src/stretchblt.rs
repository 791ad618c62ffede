//! Scaled copies.
//!
//! Phase steps are `src / dst` in 8.24 fixed point. The horizontal scaler
//! runs in divided mode: the line is cut into chunks of about 124 output
//! pixels and `hsc_adv_num` is the input advance per chunk.

use crate::{force_opaque, queue, GenError, GenResult};
use ge2d_queue::{BlendEquation, Context, LogicOp, Rect, ScaleParams, Scratch};

const DIV_CHUNK: u64 = 124;

fn phase_step(src: i32, dst: i32) -> u32 {
    let step = ((src.max(0) as u64) << 24) / (dst.max(1) as u64);
    u32::try_from(step).unwrap_or(u32::MAX)
}

/// Scaler settings mapping `src` onto `dst`.
pub(crate) fn scale_params(src: Rect, dst: Rect) -> ScaleParams {
    let hsc_phase_step = phase_step(src.w, dst.w);
    let vsc_phase_step = phase_step(src.h, dst.h);
    let div_length = if hsc_phase_step == 0 {
        0
    } else {
        (DIV_CHUNK << 24) / u64::from(hsc_phase_step)
    };
    let hsc_adv_num = (div_length * u64::from(hsc_phase_step)) >> 24;
    ScaleParams {
        hsc_enable: true,
        vsc_enable: true,
        hsc_phase_step,
        vsc_phase_step,
        hsc_start_phase: 0,
        vsc_start_phase: 0,
        hsc_rpt_num: 1,
        vsc_rpt_num: 1,
        hsc_div_en: true,
        hsc_adv_num: u32::try_from(hsc_adv_num).unwrap_or(u32::MAX),
    }
}

pub(crate) fn check_target(dst: Rect) -> GenResult<()> {
    if dst.w <= 0 || dst.h <= 0 {
        return Err(GenError::InvalidSurface("empty destination rectangle"));
    }
    Ok(())
}

fn build(scratch: &mut Scratch<'_>, src: Rect, dst: Rect, opaque: bool) {
    let cmd = scratch.command();
    cmd.src1 = src.window();
    cmd.src2 = dst.window();
    cmd.dst = dst.window();
    cmd.scale = scale_params(src, dst);
    cmd.color_blend = BlendEquation::logic(LogicOp::Copy);
    cmd.alpha_blend = BlendEquation::logic(LogicOp::Copy);
    if opaque {
        force_opaque(scratch);
    }
}

fn stretch(ctx: &Context, src: Rect, dst: Rect, opaque: bool, blocking: bool) -> GenResult<()> {
    check_target(dst)?;
    queue(ctx, blocking, |s| build(s, src, dst, opaque))
}

/// Scales `src` onto `dst` and waits for completion.
pub fn stretchblt(ctx: &Context, src: Rect, dst: Rect) -> GenResult<()> {
    stretch(ctx, src, dst, false, true)
}

/// Queues a scale of `src` onto `dst` without waiting.
pub fn stretchblt_noblk(ctx: &Context, src: Rect, dst: Rect) -> GenResult<()> {
    stretch(ctx, src, dst, false, false)
}

/// Scales `src` onto `dst` writing opaque alpha, and waits for completion.
pub fn stretchblt_noalpha(ctx: &Context, src: Rect, dst: Rect) -> GenResult<()> {
    stretch(ctx, src, dst, true, true)
}

/// Queues an opaque scale of `src` onto `dst` without waiting.
pub fn stretchblt_noalpha_noblk(ctx: &Context, src: Rect, dst: Rect) -> GenResult<()> {
    stretch(ctx, src, dst, true, false)
}

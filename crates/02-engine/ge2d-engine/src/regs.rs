//! Register map of the accelerator model and the encoders that turn
//! descriptors into register writes.
//!
//! Every encoder returns a [`WriteBatch`] so a whole group can be pushed to
//! the bus (and traced) in one go. [`decode_command`] is the inverse of
//! [`encode_command`] and lets a bus model recover what was started.

use ge2d_queue::{
    BlendEquation, BlendMode, ClipMode, Command, Config, LogicOp, ScaleParams, UpdateFlags, Window,
};
use smallvec::SmallVec;

/// Address/value pairs written in order.
pub type WriteBatch = SmallVec<[(u32, u32); 16]>;

/// General control 0: interrupt control in bits 0..2.
pub const GEN_CTRL0: u32 = 0x00;
/// General control 1: soft reset in bit 31.
pub const GEN_CTRL1: u32 = 0x04;
/// Status 0: busy in bit 0.
pub const STATUS0: u32 = 0x08;
/// Status 1: free-running diagnostic word.
pub const STATUS1: u32 = 0x0c;
/// Command control: writing [`CMD_START`] launches the loaded command.
pub const CMD_CTRL: u32 = 0x10;

/// Soft reset bit position in [`GEN_CTRL1`].
pub const SOFT_RESET_BIT: u32 = 31;
/// Busy bit in [`STATUS0`].
pub const STATUS0_BUSY: u32 = 1 << 0;
/// Start bit in [`CMD_CTRL`].
pub const CMD_START: u32 = 1 << 0;
/// Interrupt when a command completes.
pub const INT_ON_CMD_DONE: u32 = 0x02;

pub const SRC1_ADDR_LO: u32 = 0x20;
pub const SRC1_ADDR_HI: u32 = 0x24;
pub const SRC1_STRIDE: u32 = 0x28;
pub const SRC1_FORMAT: u32 = 0x2c;
pub const SRC1_DEF_COLOR: u32 = 0x30;

pub const SRC1_CLIP_X: u32 = 0x40;
pub const SRC1_CLIP_Y: u32 = 0x44;

pub const SRC2_ADDR_LO: u32 = 0x60;
pub const SRC2_ADDR_HI: u32 = 0x64;
pub const SRC2_STRIDE: u32 = 0x68;
pub const SRC2_FORMAT: u32 = 0x6c;
pub const SRC2_DEF_COLOR: u32 = 0x70;
pub const DST_ADDR_LO: u32 = 0x74;
pub const DST_ADDR_HI: u32 = 0x78;
pub const DST_STRIDE: u32 = 0x7c;
pub const DST_FORMAT: u32 = 0x80;

pub const SRC2_CLIP_X: u32 = 0x90;
pub const SRC2_CLIP_Y: u32 = 0x94;
pub const DST_CLIP_X: u32 = 0x98;
pub const DST_CLIP_Y: u32 = 0x9c;
pub const DST_CLIP_MODE: u32 = 0xa0;

pub const ALU_CONST_COLOR: u32 = 0xb0;
pub const SRC_KEY: u32 = 0xb4;
pub const SRC_KEY_MASK: u32 = 0xb8;
pub const SRC_KEY_CTRL: u32 = 0xbc;
pub const GB_ALPHA: u32 = 0xc0;
pub const DP_CTRL: u32 = 0xc4;

pub const VSC_COEF_SEL: u32 = 0xd0;
pub const HSC_COEF_SEL: u32 = 0xd4;

pub const CMD_SRC1_X: u32 = 0x100;
pub const CMD_SRC1_Y: u32 = 0x104;
pub const CMD_SRC2_X: u32 = 0x108;
pub const CMD_SRC2_Y: u32 = 0x10c;
pub const CMD_DST_X: u32 = 0x110;
pub const CMD_DST_Y: u32 = 0x114;
pub const CMD_FLAGS: u32 = 0x118;
pub const CMD_HSC_STEP: u32 = 0x11c;
pub const CMD_VSC_STEP: u32 = 0x120;
pub const CMD_HSC_PHASE: u32 = 0x124;
pub const CMD_VSC_PHASE: u32 = 0x128;
pub const CMD_SC_MISC: u32 = 0x12c;
pub const CMD_HSC_ADV: u32 = 0x130;
pub const CMD_BLEND: u32 = 0x134;

/// One past the highest register address.
pub const REG_SPACE: u32 = 0x140;

const FLAG_SRC1_FILL: u32 = 1 << 0;
const FLAG_SRC2_FILL: u32 = 1 << 1;
const FLAG_DST_XY_SWAP: u32 = 1 << 2;
const FLAG_SRC1_CMULT: u32 = 1 << 3;
const FLAG_SRC2_CMULT: u32 = 1 << 4;
const FLAG_HSC_EN: u32 = 1 << 11;
const FLAG_VSC_EN: u32 = 1 << 12;
const FLAG_HSC_DIV_EN: u32 = 1 << 13;
// Reverse bits per window: x at `shift`, y at `shift + 1`.
const REV_SRC1_SHIFT: u32 = 5;
const REV_SRC2_SHIFT: u32 = 7;
const REV_DST_SHIFT: u32 = 9;

/// Register group an address belongs to, if it is part of one.
pub fn group_of(addr: u32) -> Option<UpdateFlags> {
    Some(match addr {
        0x20..=0x3f => UpdateFlags::SRC_DATA,
        0x40..=0x5f => UpdateFlags::SRC_GEN,
        0x60..=0x8f => UpdateFlags::DST_DATA,
        0x90..=0xaf => UpdateFlags::DST_GEN,
        0xb0..=0xcf => UpdateFlags::DP_GEN,
        0xd0..=0xdf => UpdateFlags::SCALE_COEF,
        _ => return None,
    })
}

/// Packs an inclusive span into one register: start in the low half, end in the high half.
pub fn span(start: i32, end: i32) -> u32 {
    (start as u32 & 0xffff) | ((end as u32 & 0xffff) << 16)
}

/// Inverse of [`span`].
pub fn unspan(value: u32) -> (i32, i32) {
    (value as u16 as i16 as i32, (value >> 16) as u16 as i16 as i32)
}

fn lo(addr: u64) -> u32 {
    addr as u32
}

fn hi(addr: u64) -> u32 {
    (addr >> 32) as u32
}

/// Writes for a single register group of `config`.
///
/// `group` must name exactly one group; anything else yields an empty batch.
pub fn encode_group(group: UpdateFlags, config: &Config) -> WriteBatch {
    let mut batch = WriteBatch::new();
    if group == UpdateFlags::SRC_DATA {
        let data = &config.src1_data;
        batch.extend([
            (SRC1_ADDR_LO, lo(data.addr)),
            (SRC1_ADDR_HI, hi(data.addr)),
            (SRC1_STRIDE, data.stride),
            (SRC1_FORMAT, data.format),
            (SRC1_DEF_COLOR, data.def_color),
        ]);
    } else if group == UpdateFlags::SRC_GEN {
        let clip = &config.src1_gen.clip;
        batch.extend([
            (SRC1_CLIP_X, span(clip.x, clip.x_end())),
            (SRC1_CLIP_Y, span(clip.y, clip.y_end())),
        ]);
    } else if group == UpdateFlags::DST_DATA {
        let data = &config.dst_data;
        batch.extend([
            (SRC2_ADDR_LO, lo(data.src2_addr)),
            (SRC2_ADDR_HI, hi(data.src2_addr)),
            (SRC2_STRIDE, data.src2_stride),
            (SRC2_FORMAT, data.src2_format),
            (SRC2_DEF_COLOR, data.src2_def_color),
            (DST_ADDR_LO, lo(data.dst_addr)),
            (DST_ADDR_HI, hi(data.dst_addr)),
            (DST_STRIDE, data.dst_stride),
            (DST_FORMAT, data.dst_format),
        ]);
    } else if group == UpdateFlags::DST_GEN {
        let clip = &config.dst_gen.clip;
        let mode = match config.dst_gen.clip_mode {
            ClipMode::Inside => 0,
            ClipMode::Outside => 1,
        };
        batch.extend([
            (SRC2_CLIP_X, span(clip.src2.x, clip.src2.x_end())),
            (SRC2_CLIP_Y, span(clip.src2.y, clip.src2.y_end())),
            (DST_CLIP_X, span(clip.dst.x, clip.dst.x_end())),
            (DST_CLIP_Y, span(clip.dst.y, clip.dst.y_end())),
            (DST_CLIP_MODE, mode),
        ]);
    } else if group == UpdateFlags::DP_GEN {
        let dp = &config.dp_gen;
        let key_ctrl = u32::from(dp.src_key.enable) | (u32::from(dp.src_key.mode & 0x7) << 1);
        let gb_alpha = u32::from(dp.src1_gb_alpha) | (u32::from(dp.src1_gb_alpha_en) << 8);
        batch.extend([
            (ALU_CONST_COLOR, dp.alu_const_color),
            (SRC_KEY, dp.src_key.color),
            (SRC_KEY_MASK, dp.src_key.mask),
            (SRC_KEY_CTRL, key_ctrl),
            (GB_ALPHA, gb_alpha),
            (DP_CTRL, u32::from(dp.antiflick_en)),
        ]);
    } else if group == UpdateFlags::SCALE_COEF {
        batch.extend([
            (VSC_COEF_SEL, config.v_filter as u32),
            (HSC_COEF_SEL, config.h_filter as u32),
        ]);
    }
    batch
}

fn rev_bits(window: &Window, shift: u32) -> u32 {
    (u32::from(window.x_rev) << shift) | (u32::from(window.y_rev) << (shift + 1))
}

fn blend_half(eq: &BlendEquation) -> u32 {
    ((eq.mode as u32 & 0xf) << 12)
        | ((u32::from(eq.src_factor) & 0xf) << 8)
        | ((u32::from(eq.dst_factor) & 0xf) << 4)
        | (eq.logic_op as u32 & 0xf)
}

fn unblend_half(value: u32) -> BlendEquation {
    BlendEquation {
        mode: BlendMode::from_raw(((value >> 12) & 0xf) as u8).unwrap_or_default(),
        src_factor: ((value >> 8) & 0xf) as u8,
        dst_factor: ((value >> 4) & 0xf) as u8,
        logic_op: LogicOp::from_raw((value & 0xf) as u8),
    }
}

/// Writes that load `cmd` into the command registers (without starting it).
pub fn encode_command(cmd: &Command) -> WriteBatch {
    let sc = &cmd.scale;
    let mut flags = rev_bits(&cmd.src1, REV_SRC1_SHIFT)
        | rev_bits(&cmd.src2, REV_SRC2_SHIFT)
        | rev_bits(&cmd.dst, REV_DST_SHIFT);
    for (set, bit) in [
        (cmd.src1_fill_color_en, FLAG_SRC1_FILL),
        (cmd.src2_fill_color_en, FLAG_SRC2_FILL),
        (cmd.dst_xy_swap, FLAG_DST_XY_SWAP),
        (cmd.src1_cmult_asel, FLAG_SRC1_CMULT),
        (cmd.src2_cmult_asel, FLAG_SRC2_CMULT),
        (sc.hsc_enable, FLAG_HSC_EN),
        (sc.vsc_enable, FLAG_VSC_EN),
        (sc.hsc_div_en, FLAG_HSC_DIV_EN),
    ] {
        if set {
            flags |= bit;
        }
    }

    let mut batch = WriteBatch::new();
    batch.extend([
        (CMD_SRC1_X, span(cmd.src1.x_start, cmd.src1.x_end)),
        (CMD_SRC1_Y, span(cmd.src1.y_start, cmd.src1.y_end)),
        (CMD_SRC2_X, span(cmd.src2.x_start, cmd.src2.x_end)),
        (CMD_SRC2_Y, span(cmd.src2.y_start, cmd.src2.y_end)),
        (CMD_DST_X, span(cmd.dst.x_start, cmd.dst.x_end)),
        (CMD_DST_Y, span(cmd.dst.y_start, cmd.dst.y_end)),
        (CMD_FLAGS, flags),
        (CMD_HSC_STEP, sc.hsc_phase_step),
        (CMD_VSC_STEP, sc.vsc_phase_step),
        (CMD_HSC_PHASE, sc.hsc_start_phase),
        (CMD_VSC_PHASE, sc.vsc_start_phase),
        (
            CMD_SC_MISC,
            u32::from(sc.hsc_rpt_num) | (u32::from(sc.vsc_rpt_num) << 8),
        ),
        (CMD_HSC_ADV, sc.hsc_adv_num),
        (
            CMD_BLEND,
            (blend_half(&cmd.color_blend) << 16) | blend_half(&cmd.alpha_blend),
        ),
    ]);
    batch
}

fn window_from(x: u32, y: u32, flags: u32, shift: u32) -> Window {
    let (x_start, x_end) = unspan(x);
    let (y_start, y_end) = unspan(y);
    Window {
        x_start,
        y_start,
        x_end,
        y_end,
        x_rev: flags & (1 << shift) != 0,
        y_rev: flags & (1 << (shift + 1)) != 0,
    }
}

/// Rebuilds the command loaded in the command registers.
///
/// `wait_done` and `hang` are host-side bookkeeping and always come back `false`.
pub fn decode_command(read: impl Fn(u32) -> u32) -> Command {
    let flags = read(CMD_FLAGS);
    let misc = read(CMD_SC_MISC);
    let blend = read(CMD_BLEND);
    Command {
        src1: window_from(read(CMD_SRC1_X), read(CMD_SRC1_Y), flags, REV_SRC1_SHIFT),
        src1_fill_color_en: flags & FLAG_SRC1_FILL != 0,
        src2: window_from(read(CMD_SRC2_X), read(CMD_SRC2_Y), flags, REV_SRC2_SHIFT),
        src2_fill_color_en: flags & FLAG_SRC2_FILL != 0,
        dst: window_from(read(CMD_DST_X), read(CMD_DST_Y), flags, REV_DST_SHIFT),
        dst_xy_swap: flags & FLAG_DST_XY_SWAP != 0,
        scale: ScaleParams {
            hsc_enable: flags & FLAG_HSC_EN != 0,
            vsc_enable: flags & FLAG_VSC_EN != 0,
            hsc_phase_step: read(CMD_HSC_STEP),
            vsc_phase_step: read(CMD_VSC_STEP),
            hsc_start_phase: read(CMD_HSC_PHASE),
            vsc_start_phase: read(CMD_VSC_PHASE),
            hsc_rpt_num: (misc & 0xff) as u8,
            vsc_rpt_num: ((misc >> 8) & 0xff) as u8,
            hsc_div_en: flags & FLAG_HSC_DIV_EN != 0,
            hsc_adv_num: read(CMD_HSC_ADV),
        },
        src1_cmult_asel: flags & FLAG_SRC1_CMULT != 0,
        src2_cmult_asel: flags & FLAG_SRC2_CMULT != 0,
        color_blend: unblend_half(blend >> 16),
        alpha_blend: unblend_half(blend & 0xffff),
        wait_done: false,
        hang: false,
    }
}

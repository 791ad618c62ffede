//! Command and configuration descriptors.
//!
//! A [`Command`] describes one accelerator operation: the source and
//! destination windows, scaling and the blend equations. A [`Config`] carries
//! the register groups that change less often (surfaces, clipping, colour
//! keys). Its [`UpdateFlags`] say which groups must be rewritten before the
//! command starts.

use bitflags::bitflags;

bitflags! {
    /// Register groups that must be rewritten before a command starts.
    ///
    /// Groups are applied in ascending bit order.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UpdateFlags: u32 {
        /// Source 1 surface (address, stride, format).
        const SRC_DATA = 0x01;
        /// Source 1 generation (clip window, fill colour).
        const SRC_GEN = 0x02;
        /// Source 2 and destination surfaces.
        const DST_DATA = 0x04;
        /// Source 2 and destination generation (clip windows, clip mode).
        const DST_GEN = 0x08;
        /// Data path (ALU constant, colour key, global alpha, antiflicker).
        const DP_GEN = 0x10;
        /// Scaler filter coefficient tables.
        const SCALE_COEF = 0x20;
    }
}

/// Rectangle in surface pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
}

impl Rect {
    /// Creates a rectangle from origin and extent.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Inclusive right edge.
    pub const fn x_end(&self) -> i32 {
        self.x + self.w - 1
    }

    /// Inclusive bottom edge.
    pub const fn y_end(&self) -> i32 {
        self.y + self.h - 1
    }

    /// Window covering this rectangle in forward scan order.
    pub const fn window(&self) -> Window {
        Window {
            x_start: self.x,
            y_start: self.y,
            x_end: self.x_end(),
            y_end: self.y_end(),
            x_rev: false,
            y_rev: false,
        }
    }
}

/// Inclusive scan window of one surface as the hardware walks it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Window {
    /// First column.
    pub x_start: i32,
    /// First row.
    pub y_start: i32,
    /// Last column.
    pub x_end: i32,
    /// Last row.
    pub y_end: i32,
    /// Walk columns right to left.
    pub x_rev: bool,
    /// Walk rows bottom to top.
    pub y_rev: bool,
}

/// Scaler filter kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FilterType {
    /// Bicubic.
    Bicubic = 1,
    /// Bilinear.
    #[default]
    Bilinear = 2,
    /// Triangle.
    Triangle = 3,
    /// Gaussian, variant 0.
    Gau0 = 4,
    /// Gaussian, variant 0 for the bottom field.
    Gau0Bot = 5,
    /// Gaussian, variant 1.
    Gau1 = 6,
}

impl FilterType {
    /// Decodes a raw filter number.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Bicubic,
            2 => Self::Bilinear,
            3 => Self::Triangle,
            4 => Self::Gau0,
            5 => Self::Gau0Bot,
            6 => Self::Gau1,
            _ => return None,
        })
    }
}

/// Blend equation modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendMode {
    /// `src * sf + dst * df`.
    #[default]
    Add = 0,
    /// `src * sf - dst * df`.
    Subtract = 1,
    /// `dst * df - src * sf`.
    ReverseSubtract = 2,
    /// Component minimum.
    Min = 3,
    /// Component maximum.
    Max = 4,
    /// Bitwise raster operation selected by [`LogicOp`].
    Logic = 5,
}

impl BlendMode {
    /// Decodes a raw mode number.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Add,
            1 => Self::Subtract,
            2 => Self::ReverseSubtract,
            3 => Self::Min,
            4 => Self::Max,
            5 => Self::Logic,
            _ => return None,
        })
    }
}

/// Raster operations available in [`BlendMode::Logic`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum LogicOp {
    #[default]
    Clear = 0,
    Copy = 1,
    Noop = 2,
    Set = 3,
    CopyInvert = 4,
    Invert = 5,
    AndReverse = 6,
    OrReverse = 7,
    And = 8,
    Or = 9,
    Nand = 10,
    Nor = 11,
    Xor = 12,
    Equiv = 13,
    AndInvert = 14,
    OrInvert = 15,
}

impl LogicOp {
    /// Decodes the low four bits of `raw`.
    pub fn from_raw(raw: u8) -> Self {
        use LogicOp::*;
        const TABLE: [LogicOp; 16] = [
            Clear, Copy, Noop, Set, CopyInvert, Invert, AndReverse, OrReverse, And, Or, Nand,
            Nor, Xor, Equiv, AndInvert, OrInvert,
        ];
        TABLE[(raw & 0x0f) as usize]
    }
}

/// One blend equation (colour or alpha channel).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlendEquation {
    /// Combining mode.
    pub mode: BlendMode,
    /// Source factor selector.
    pub src_factor: u8,
    /// Destination factor selector.
    pub dst_factor: u8,
    /// Raster operation, used when `mode` is [`BlendMode::Logic`].
    pub logic_op: LogicOp,
}

impl BlendEquation {
    /// Equation that performs `op` as a raster operation.
    pub const fn logic(op: LogicOp) -> Self {
        Self {
            mode: BlendMode::Logic,
            src_factor: 0,
            dst_factor: 0,
            logic_op: op,
        }
    }
}

/// Scaler settings for one command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScaleParams {
    /// Horizontal scaler enabled.
    pub hsc_enable: bool,
    /// Vertical scaler enabled.
    pub vsc_enable: bool,
    /// Horizontal phase step (source/destination ratio in 8.24 fixed point).
    pub hsc_phase_step: u32,
    /// Vertical phase step (source/destination ratio in 8.24 fixed point).
    pub vsc_phase_step: u32,
    /// Initial horizontal phase.
    pub hsc_start_phase: u32,
    /// Initial vertical phase.
    pub vsc_start_phase: u32,
    /// Horizontal edge pixel repeat count.
    pub hsc_rpt_num: u8,
    /// Vertical edge line repeat count.
    pub vsc_rpt_num: u8,
    /// Horizontal phase slope enabled.
    pub hsc_div_en: bool,
    /// Horizontal advance per output pixel when `hsc_div_en` is set.
    pub hsc_adv_num: u32,
}

/// Hardware-operation descriptor.
///
/// Zeroed (`Default`) after it is copied into a slot so the next command
/// starts from a clean scratch area.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    /// Source 1 read window.
    pub src1: Window,
    /// Source 1 produces a constant fill colour instead of reading memory.
    pub src1_fill_color_en: bool,
    /// Source 2 read window.
    pub src2: Window,
    /// Source 2 produces a constant fill colour instead of reading memory.
    pub src2_fill_color_en: bool,
    /// Destination write window.
    pub dst: Window,
    /// Swap x and y on the destination (rotation).
    pub dst_xy_swap: bool,
    /// Scaler settings.
    pub scale: ScaleParams,
    /// Multiply source 1 colour by its alpha.
    pub src1_cmult_asel: bool,
    /// Multiply source 2 colour by its alpha.
    pub src2_cmult_asel: bool,
    /// Colour-channel blend equation.
    pub color_blend: BlendEquation,
    /// Alpha-channel blend equation.
    pub alpha_blend: BlendEquation,
    /// The submitter waits for this command to retire.
    pub wait_done: bool,
    /// Set by the dispatcher while the command is on hardware.
    pub hang: bool,
}

/// Source 1 surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Src1Data {
    /// Physical base address.
    pub addr: u64,
    /// Bytes per line.
    pub stride: u32,
    /// Pixel format code.
    pub format: u32,
    /// Colour used when the source is a constant fill.
    pub def_color: u32,
}

/// Source 1 generation block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Src1Gen {
    /// Readable area of source 1.
    pub clip: Rect,
}

/// Source 2 and destination surfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DstData {
    /// Source 2 physical base address.
    pub src2_addr: u64,
    /// Source 2 bytes per line.
    pub src2_stride: u32,
    /// Source 2 pixel format code.
    pub src2_format: u32,
    /// Source 2 constant fill colour.
    pub src2_def_color: u32,
    /// Destination physical base address.
    pub dst_addr: u64,
    /// Destination bytes per line.
    pub dst_stride: u32,
    /// Destination pixel format code.
    pub dst_format: u32,
}

/// How the destination clip rectangle is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipMode {
    /// Only pixels inside the clip rectangle are written.
    #[default]
    Inside,
    /// Only pixels outside the clip rectangle are written.
    Outside,
}

/// Clip rectangles of source 2 and destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClipRect {
    /// Readable area of source 2.
    pub src2: Rect,
    /// Writable area of the destination.
    pub dst: Rect,
}

/// Source 2 and destination generation block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DstGen {
    /// Clip rectangles.
    pub clip: ClipRect,
    /// Destination clip mode.
    pub clip_mode: ClipMode,
}

/// Colour key applied to source pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorKey {
    /// Keying enabled.
    pub enable: bool,
    /// Match mode (0: pixels equal to the key are transparent).
    pub mode: u8,
    /// Key colour.
    pub color: u32,
    /// Bits of the colour compared against the key.
    pub mask: u32,
}

/// Data-path generation block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpGen {
    /// Constant colour fed to the ALU.
    pub alu_const_color: u32,
    /// Source colour key.
    pub src_key: ColorKey,
    /// Apply `src1_gb_alpha` instead of per-pixel alpha.
    pub src1_gb_alpha_en: bool,
    /// Global alpha of source 1.
    pub src1_gb_alpha: u8,
    /// Antiflicker filter on the output.
    pub antiflick_en: bool,
}

/// Register groups of one command plus the groups that changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Source 1 surface.
    pub src1_data: Src1Data,
    /// Source 1 generation.
    pub src1_gen: Src1Gen,
    /// Source 2 and destination surfaces.
    pub dst_data: DstData,
    /// Source 2 and destination generation.
    pub dst_gen: DstGen,
    /// Data path.
    pub dp_gen: DpGen,
    /// Vertical scaler filter.
    pub v_filter: FilterType,
    /// Horizontal scaler filter.
    pub h_filter: FilterType,
    /// Groups that must be rewritten before the command starts.
    pub update: UpdateFlags,
}

impl Config {
    /// Marks `groups` for rewrite.
    pub fn mark(&mut self, groups: UpdateFlags) {
        self.update |= groups;
    }
}

//! Bulk surface configuration of a context.

use crate::format::PixelFormat;
use crate::{GenError, GenResult};
use ge2d_queue::{ClipMode, ColorKey, Context, FilterType, Rect, UpdateFlags};
use log::debug;

/// A buffer the accelerator reads or writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Surface {
    /// Physical base address handed out by the buffer allocator.
    pub addr: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Accessible area; the whole surface when `None`.
    pub clip: Option<Rect>,
}

impl Surface {
    /// Bytes per line.
    pub fn stride(&self) -> u32 {
        self.format.stride(self.width)
    }

    fn clip_rect(&self) -> Rect {
        self.clip
            .unwrap_or_else(|| Rect::new(0, 0, self.width as i32, self.height as i32))
    }

    fn validate(&self, what: &'static str) -> GenResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GenError::InvalidSurface(what));
        }
        if self.width > i16::MAX as u32 || self.height > i16::MAX as u32 {
            return Err(GenError::InvalidSurface(what));
        }
        Ok(())
    }
}

/// Everything [`configure`] programs in one call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// Source 1.
    pub src: Surface,
    /// Source 2; the destination is read back as source 2 when `None`.
    pub src2: Option<Surface>,
    /// Destination.
    pub dst: Surface,
    /// Constant colour fed to the ALU.
    pub alu_const_color: u32,
    /// Source colour key.
    pub src_key: ColorKey,
    /// Global alpha applied to source 1, if any.
    pub src_global_alpha: Option<u8>,
    /// Horizontal scaler filter.
    pub h_filter: FilterType,
    /// Vertical scaler filter.
    pub v_filter: FilterType,
}

/// Programs surfaces, clipping, colour key and filters into the scratch
/// configuration of `ctx` and marks every register group for rewrite.
pub fn configure(ctx: &Context, cfg: &SurfaceConfig) -> GenResult<()> {
    cfg.src.validate("source")?;
    cfg.dst.validate("destination")?;
    let src2 = cfg.src2.unwrap_or(cfg.dst);
    src2.validate("second source")?;

    let mut scratch = ctx.current();
    let config = scratch.config();

    config.src1_data.addr = cfg.src.addr;
    config.src1_data.stride = cfg.src.stride();
    config.src1_data.format = cfg.src.format.code();
    config.src1_gen.clip = cfg.src.clip_rect();

    config.dst_data.src2_addr = src2.addr;
    config.dst_data.src2_stride = src2.stride();
    config.dst_data.src2_format = src2.format.code();
    config.dst_data.dst_addr = cfg.dst.addr;
    config.dst_data.dst_stride = cfg.dst.stride();
    config.dst_data.dst_format = cfg.dst.format.code();

    config.dst_gen.clip.src2 = src2.clip_rect();
    config.dst_gen.clip.dst = cfg.dst.clip_rect();
    config.dst_gen.clip_mode = ClipMode::Inside;

    config.dp_gen.alu_const_color = cfg.alu_const_color;
    config.dp_gen.src_key = cfg.src_key;
    config.dp_gen.src1_gb_alpha_en = cfg.src_global_alpha.is_some();
    config.dp_gen.src1_gb_alpha = cfg.src_global_alpha.unwrap_or(0xff);

    config.h_filter = cfg.h_filter;
    config.v_filter = cfg.v_filter;
    config.mark(UpdateFlags::all());

    debug!(
        "{}: configured src {:#x} {}x{} dst {:#x} {}x{}",
        ctx.id(),
        cfg.src.addr,
        cfg.src.width,
        cfg.src.height,
        cfg.dst.addr,
        cfg.dst.width,
        cfg.dst.height
    );
    Ok(())
}

//! Pixel format codes.
//!
//! A format code packs the storage class (bits 8..10), colour-space flags and
//! a colour map (bits 20..24). Only the storage class and the NV12/NV21 maps
//! matter for stride computation.

use crate::{GenError, GenResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const BPP_MASK: u32 = 0x0300;
const BPP_8: u32 = 0x0000;
const BPP_16: u32 = 0x0100;
const BPP_24: u32 = 0x0200;

const COLOR_MAP_SHIFT: u32 = 20;
const COLOR_MAP_MASK: u32 = 0xf << COLOR_MAP_SHIFT;
const COLOR_MAP_NV21: u32 = 14 << COLOR_MAP_SHIFT;
const COLOR_MAP_NV12: u32 = 15 << COLOR_MAP_SHIFT;

const LITTLE_ENDIAN: u32 = 1 << 24;
const DEEP_COLOR: u32 = 1 << 18;
const YUV: u32 = 1 << 17;
const FULL_RANGE: u32 = 1 << 16;
const KNOWN_BITS: u32 = LITTLE_ENDIAN | COLOR_MAP_MASK | DEEP_COLOR | YUV | FULL_RANGE | 0x03ff;

/// Pixel format of a surface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PixelFormat(u32);

impl PixelFormat {
    /// 8-bit luma plane.
    pub const S8_Y: Self = Self(YUV);
    /// 16-bit RGB 5:6:5.
    pub const S16_RGB_565: Self = Self(LITTLE_ENDIAN | BPP_16 | (5 << COLOR_MAP_SHIFT));
    /// 16-bit ARGB 1:5:5:5.
    pub const S16_ARGB_1555: Self = Self(LITTLE_ENDIAN | BPP_16 | (7 << COLOR_MAP_SHIFT));
    /// 24-bit RGB.
    pub const S24_RGB: Self = Self(LITTLE_ENDIAN | BPP_24);
    /// 24-bit BGR.
    pub const S24_BGR: Self = Self(LITTLE_ENDIAN | BPP_24 | (5 << COLOR_MAP_SHIFT));
    /// 32-bit RGBA.
    pub const S32_RGBA: Self = Self(LITTLE_ENDIAN | BPP_MASK);
    /// 32-bit ARGB.
    pub const S32_ARGB: Self = Self(LITTLE_ENDIAN | BPP_MASK | (1 << COLOR_MAP_SHIFT));
    /// 32-bit ABGR.
    pub const S32_ABGR: Self = Self(LITTLE_ENDIAN | BPP_MASK | (2 << COLOR_MAP_SHIFT));
    /// 32-bit BGRA.
    pub const S32_BGRA: Self = Self(LITTLE_ENDIAN | BPP_MASK | (3 << COLOR_MAP_SHIFT));
    /// Semi-planar YUV 4:2:0, interleaved CbCr.
    pub const NV12: Self = Self(YUV | 0x0207 | COLOR_MAP_NV12);
    /// Semi-planar YUV 4:2:0, interleaved CrCb.
    pub const NV21: Self = Self(YUV | 0x0207 | COLOR_MAP_NV21);

    /// Validates a raw format code.
    pub fn from_code(code: u32) -> GenResult<Self> {
        if code & !KNOWN_BITS != 0 {
            return Err(GenError::UnsupportedFormat(code));
        }
        Ok(Self(code))
    }

    /// Raw format code as programmed into the surface registers.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Bits per pixel of the first plane.
    pub const fn bpp(self) -> u32 {
        match self.0 & BPP_MASK {
            BPP_8 => 8,
            BPP_16 => 16,
            BPP_24 => {
                let map = self.0 & COLOR_MAP_MASK;
                if map == COLOR_MAP_NV12 || map == COLOR_MAP_NV21 {
                    8
                } else {
                    24
                }
            }
            _ => 32,
        }
    }

    /// Bytes per line of a surface `width` pixels wide.
    pub const fn stride(self, width: u32) -> u32 {
        width * self.bpp() / 8
    }

    /// Whether the code selects a YUV colour space.
    pub const fn is_yuv(self) -> bool {
        self.0 & YUV != 0
    }

    /// Whether pixels carry an alpha channel.
    pub fn has_alpha(self) -> bool {
        let map = (self.0 & COLOR_MAP_MASK) >> COLOR_MAP_SHIFT;
        match self.0 & BPP_MASK {
            BPP_8 => false,
            BPP_16 => matches!(map, 3 | 4 | 6 | 7 | 8),
            BPP_24 => matches!(map, 1..=4),
            _ => true,
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::S32_ARGB
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelFormat({:#x}, {}bpp)", self.0, self.bpp())
    }
}

impl TryFrom<u32> for PixelFormat {
    type Error = GenError;

    fn try_from(code: u32) -> GenResult<Self> {
        Self::from_code(code)
    }
}

impl From<PixelFormat> for u32 {
    fn from(format: PixelFormat) -> u32 {
        format.0
    }
}

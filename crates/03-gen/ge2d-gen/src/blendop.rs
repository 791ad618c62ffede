//! Packed blend operations.
//!
//! A blend op carries both equations in one word:
//! `color_mode<<24 | color_src<<20 | color_dst<<16 | alpha_mode<<8 | alpha_src<<4 | alpha_dst`.
//! In logic mode the source-factor nibble holds the raster operation.

use ge2d_queue::{BlendEquation, BlendMode, LogicOp};

#[allow(missing_docs)]
pub mod color_factor {
    pub const ZERO: u8 = 0;
    pub const ONE: u8 = 1;
    pub const SRC_COLOR: u8 = 2;
    pub const ONE_MINUS_SRC_COLOR: u8 = 3;
    pub const DST_COLOR: u8 = 4;
    pub const ONE_MINUS_DST_COLOR: u8 = 5;
    pub const SRC_ALPHA: u8 = 6;
    pub const ONE_MINUS_SRC_ALPHA: u8 = 7;
    pub const DST_ALPHA: u8 = 8;
    pub const ONE_MINUS_DST_ALPHA: u8 = 9;
    pub const CONST_COLOR: u8 = 10;
    pub const ONE_MINUS_CONST_COLOR: u8 = 11;
    pub const CONST_ALPHA: u8 = 12;
    pub const ONE_MINUS_CONST_ALPHA: u8 = 13;
    pub const SRC_ALPHA_SATURATE: u8 = 14;
}

#[allow(missing_docs)]
pub mod alpha_factor {
    pub const ZERO: u8 = 0;
    pub const ONE: u8 = 1;
    pub const SRC_ALPHA: u8 = 2;
    pub const ONE_MINUS_SRC_ALPHA: u8 = 3;
    pub const DST_ALPHA: u8 = 4;
    pub const ONE_MINUS_DST_ALPHA: u8 = 5;
    pub const CONST_ALPHA: u8 = 6;
    pub const ONE_MINUS_CONST_ALPHA: u8 = 7;
}

/// Colour and alpha blend equations packed into one word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendOp(pub u32);

impl BlendOp {
    /// Classic source-over: `src * a + dst * (1 - a)` for both channels.
    pub const SRC_OVER: Self = Self::pack(
        BlendMode::Add,
        color_factor::SRC_ALPHA,
        color_factor::ONE_MINUS_SRC_ALPHA,
        BlendMode::Add,
        alpha_factor::ONE,
        alpha_factor::ONE_MINUS_SRC_ALPHA,
    );

    /// Packs two equations.
    pub const fn pack(
        color_mode: BlendMode,
        color_src: u8,
        color_dst: u8,
        alpha_mode: BlendMode,
        alpha_src: u8,
        alpha_dst: u8,
    ) -> Self {
        Self(
            ((color_mode as u32 & 0xf) << 24)
                | ((color_src as u32 & 0xf) << 20)
                | ((color_dst as u32 & 0xf) << 16)
                | ((alpha_mode as u32 & 0xf) << 8)
                | ((alpha_src as u32 & 0xf) << 4)
                | (alpha_dst as u32 & 0xf),
        )
    }

    /// Both channels perform raster operation `op`.
    pub const fn logic(op: LogicOp) -> Self {
        Self::pack(BlendMode::Logic, op as u8, 0, BlendMode::Logic, op as u8, 0)
    }

    /// Colour-channel equation.
    pub fn color(self) -> BlendEquation {
        unpack((self.0 >> 16) as u16)
    }

    /// Alpha-channel equation.
    pub fn alpha(self) -> BlendEquation {
        unpack(self.0 as u16)
    }
}

fn unpack(half: u16) -> BlendEquation {
    let mode = BlendMode::from_raw(((half >> 8) & 0xf) as u8).unwrap_or_default();
    let src = ((half >> 4) & 0xf) as u8;
    let dst = (half & 0xf) as u8;
    if mode == BlendMode::Logic {
        BlendEquation::logic(LogicOp::from_raw(src))
    } else {
        BlendEquation {
            mode,
            src_factor: src,
            dst_factor: dst,
            logic_op: LogicOp::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_matches_the_word_layout() {
        let op = BlendOp::pack(
            BlendMode::Subtract,
            color_factor::DST_ALPHA,
            color_factor::ONE,
            BlendMode::Max,
            alpha_factor::CONST_ALPHA,
            alpha_factor::ZERO,
        );
        assert_eq!(op.0, 0x0181_0460);
        assert_eq!(op.color().mode, BlendMode::Subtract);
        assert_eq!(op.color().src_factor, color_factor::DST_ALPHA);
        assert_eq!(op.alpha().mode, BlendMode::Max);
        assert_eq!(op.alpha().src_factor, alpha_factor::CONST_ALPHA);
    }

    #[test]
    fn logic_mode_carries_the_raster_op() {
        let op = BlendOp::logic(LogicOp::Xor);
        assert_eq!(op.color(), BlendEquation::logic(LogicOp::Xor));
        assert_eq!(op.alpha().logic_op, LogicOp::Xor);
    }

    #[test]
    fn unknown_mode_falls_back_to_add() {
        assert_eq!(BlendOp(0x0f00_0000).color().mode, BlendMode::Add);
    }
}

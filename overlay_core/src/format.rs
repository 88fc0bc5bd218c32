// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats, color depths, and their hardware encodings.
//!
//! [`PixelFormat`] is the engine-facing description of pixel memory.
//! [`ControllerFormat`] is what the display controller can scan out; the
//! mapping between the two is partial, and a format without a mapping that
//! reaches a layer is a configuration bug (see [`PixelFormat::controller_format`]).

use crate::error::{ErrorCode, fatal};

/// Engine-facing pixel layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelFormat {
    /// 32-bit, straight alpha.
    Argb32 = 0,
    /// 32-bit, premultiplied alpha.
    Argb32Premultiplied = 1,
    /// 32-bit, opaque (alpha byte ignored).
    Rgb32 = 2,
    /// 24-bit packed, opaque.
    Rgb888 = 3,
    /// 16-bit 5:6:5, opaque.
    Rgb16 = 4,
    /// 8-bit 3:3:2, opaque.
    Rgb332 = 5,
    /// 16-bit 4:4:4:4, straight alpha.
    Argb4444 = 6,
    /// 16-bit 4:4:4:4, premultiplied alpha.
    Argb4444Premultiplied = 7,
    /// 8-bit coverage mask.
    Alpha8 = 8,
    /// 1-bit coverage mask.
    Alpha1 = 9,
    /// Run-length encoded 32-bit, straight alpha.
    RleArgb32 = 10,
    /// Run-length encoded 32-bit, premultiplied alpha.
    RleArgb32Premultiplied = 11,
    /// Run-length encoded 32-bit, opaque.
    RleRgb32 = 12,
    /// Run-length encoded 24-bit, opaque.
    RleRgb888 = 13,
}

impl PixelFormat {
    /// Returns the storage size of one decoded pixel in bits.
    #[must_use]
    pub const fn bits_per_pixel(self) -> u8 {
        match self {
            Self::Argb32
            | Self::Argb32Premultiplied
            | Self::Rgb32
            | Self::RleArgb32
            | Self::RleArgb32Premultiplied
            | Self::RleRgb32 => 32,
            Self::Rgb888 | Self::RleRgb888 => 24,
            Self::Rgb16 | Self::Argb4444 | Self::Argb4444Premultiplied => 16,
            Self::Rgb332 | Self::Alpha8 => 8,
            Self::Alpha1 => 1,
        }
    }

    /// Returns whether pixels of this format are run-length encoded.
    #[must_use]
    pub const fn is_rle(self) -> bool {
        matches!(
            self,
            Self::RleArgb32 | Self::RleArgb32Premultiplied | Self::RleRgb32 | Self::RleRgb888
        )
    }

    /// Maps to the display controller's scan-out format, if it has one.
    #[must_use]
    pub const fn try_controller_format(self) -> Option<ControllerFormat> {
        match self {
            Self::Argb32 | Self::Rgb32 => Some(ControllerFormat::Argb8888),
            Self::Argb4444 => Some(ControllerFormat::Argb4444),
            Self::Rgb16 => Some(ControllerFormat::Rgb565),
            Self::Rgb888 => Some(ControllerFormat::Rgb888),
            _ => None,
        }
    }

    /// Maps to the display controller's scan-out format.
    ///
    /// Halts with [`ErrorCode::UnsupportedPixelFormat`] if the controller
    /// cannot scan out this format; the format value is the context.
    #[must_use]
    #[track_caller]
    pub fn controller_format(self) -> ControllerFormat {
        match self.try_controller_format() {
            Some(f) => f,
            None => {
                log::error!("display controller cannot scan out {self:?}");
                fatal(ErrorCode::UnsupportedPixelFormat, i64::from(self as u8))
            }
        }
    }
}

/// Color depth requested for a layer's pixel memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorDepth {
    /// 8 bits per pixel.
    Bpp8,
    /// 16 bits per pixel, opaque.
    Bpp16,
    /// 16 bits per pixel with alpha.
    Bpp16Alpha,
    /// 24 bits per pixel.
    Bpp24,
    /// 32 bits per pixel, opaque.
    Bpp32,
    /// 32 bits per pixel with alpha.
    Bpp32Alpha,
}

impl ColorDepth {
    /// Returns the bits per pixel actually allocated for this depth.
    ///
    /// The controller has no 8- or 24-bit drawable format, so 8-bit depths
    /// are promoted to 16 and 24-bit depths to 32.
    #[must_use]
    pub const fn bits_per_pixel(self) -> u8 {
        match self {
            Self::Bpp8 | Self::Bpp16 | Self::Bpp16Alpha => 16,
            Self::Bpp24 | Self::Bpp32 | Self::Bpp32Alpha => 32,
        }
    }

    /// Returns the pixel format used for this depth.
    #[must_use]
    pub const fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Bpp8 | Self::Bpp16 => PixelFormat::Rgb16,
            Self::Bpp16Alpha => PixelFormat::Argb4444,
            Self::Bpp24 | Self::Bpp32 | Self::Bpp32Alpha => PixelFormat::Argb32,
        }
    }
}

/// Display-controller scan-out format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControllerFormat {
    /// 32-bit with alpha.
    Argb8888,
    /// 16-bit with 4-bit alpha.
    Argb4444,
    /// 16-bit 5:6:5.
    Rgb565,
    /// 24-bit packed.
    Rgb888,
}

/// Returns the byte stride of one row of `width` pixels at `bits_per_pixel`,
/// rounded up to whole bytes.
#[inline]
#[must_use]
pub const fn bytes_per_line(bits_per_pixel: u8, width: u32) -> u32 {
    (bits_per_pixel as u32 * width + 7) >> 3
}

/// A 32-bit straight-alpha color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba32 {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel.
    pub alpha: u8,
}

impl Rgba32 {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 0xff);
    /// Opaque white.
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff, 0xff);

    /// Creates a color.
    #[inline]
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Returns whether the color is fully opaque.
    #[inline]
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.alpha == 0xff
    }

    /// Packs as `0xAABBGGRR`, the byte order the GPU expects.
    #[inline]
    #[must_use]
    pub const fn to_abgr(self) -> u32 {
        (self.alpha as u32) << 24
            | (self.blue as u32) << 16
            | (self.green as u32) << 8
            | self.red as u32
    }

    /// Packs as `0xAARRGGBB`.
    #[inline]
    #[must_use]
    pub const fn to_argb(self) -> u32 {
        (self.alpha as u32) << 24
            | (self.red as u32) << 16
            | (self.green as u32) << 8
            | self.blue as u32
    }
}

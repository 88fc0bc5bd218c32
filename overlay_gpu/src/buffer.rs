// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU buffer descriptors.
//!
//! A [`GpuBuffer`] describes memory the GPU reads or writes. It never owns
//! that memory: item-layer buffers belong to their layer, source textures to
//! the engine, and cached copies to the
//! [`RotationCache`](crate::rotation_cache::RotationCache).

use overlay_core::format::PixelFormat;
use overlay_core::surface::SurfaceDescriptor;

/// Pixel layouts the GPU can sample and render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuFormat {
    /// 32-bit with alpha, memory order B, G, R, A.
    Bgra8888,
    /// 32-bit with the alpha byte ignored.
    Bgrx8888,
    /// 16-bit 5-6-5.
    Bgr565,
    /// 16-bit with 4-bit channels.
    Bgra4444,
    /// 8-bit coverage.
    A8,
}

impl GpuFormat {
    /// Maps a pixel format to the GPU format that samples it, if any.
    #[must_use]
    pub const fn from_pixel_format(format: PixelFormat) -> Option<Self> {
        match format {
            PixelFormat::Argb32 | PixelFormat::Argb32Premultiplied => Some(Self::Bgra8888),
            PixelFormat::Rgb32 => Some(Self::Bgrx8888),
            PixelFormat::Rgb16 => Some(Self::Bgr565),
            PixelFormat::Argb4444 | PixelFormat::Argb4444Premultiplied => Some(Self::Bgra4444),
            PixelFormat::Alpha8 => Some(Self::A8),
            _ => None,
        }
    }

    /// Returns whether the format carries coverage or alpha.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Bgra8888 | Self::Bgra4444 | Self::A8)
    }
}

/// How a blitted image combines with the paint color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageMode {
    /// Image pixels are used as they are.
    Normal,
    /// Image pixels are multiplied by the paint color.
    Multiply,
}

/// Whether the GPU honours the image's alpha when blitting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transparency {
    /// Alpha is ignored.
    Opaque,
    /// Alpha is blended.
    Transparent,
}

/// A GPU view of pixel memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuBuffer {
    /// Address of the first pixel.
    pub address: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    /// Pixel layout.
    pub format: GpuFormat,
    /// Whether the memory uses the GPU's 4×4 tiled layout.
    pub tiled: bool,
    /// Color combination mode when used as a blit source.
    pub image_mode: ImageMode,
    /// Alpha handling when used as a blit source.
    pub transparency: Transparency,
}

impl GpuBuffer {
    /// Creates a linear descriptor for `surface`, or `None` if the GPU cannot
    /// use its format.
    ///
    /// Formats with alpha are marked transparent; all source images multiply
    /// with the paint color.
    #[must_use]
    pub fn from_surface(surface: &SurfaceDescriptor) -> Option<Self> {
        let format = GpuFormat::from_pixel_format(surface.format)?;
        Some(Self {
            address: surface.address,
            width: surface.size.width,
            height: surface.size.height,
            stride: surface.bytes_per_line,
            format,
            tiled: false,
            image_mode: ImageMode::Multiply,
            transparency: if format.has_alpha() {
                Transparency::Transparent
            } else {
                Transparency::Opaque
            },
        })
    }

    /// Returns the number of bytes the buffer spans.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Returns the address range the buffer spans.
    #[must_use]
    pub fn range(&self) -> core::ops::Range<usize> {
        self.address..self.address + self.byte_len()
    }
}

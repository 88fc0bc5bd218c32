// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Descriptions of pixel memory: textures, drawable surfaces, and the
//! host-facing framebuffer layout.
//!
//! Memory is referred to by address rather than by pointer. The compositor
//! never touches pixels itself; addresses are handed to the display
//! controller and the GPU, which do.

use crate::format::{PixelFormat, bytes_per_line};
use crate::geometry::Size;

/// A block of pixel memory the compositor can point hardware at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceDescriptor {
    /// Address of the first pixel.
    pub address: usize,
    /// Pixel extent.
    pub size: Size,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Bytes from the start of one row to the next.
    pub bytes_per_line: u32,
}

impl SurfaceDescriptor {
    /// Creates a descriptor with a tightly packed stride.
    #[must_use]
    pub const fn packed(address: usize, size: Size, format: PixelFormat) -> Self {
        Self {
            address,
            size,
            format,
            bytes_per_line: bytes_per_line(format.bits_per_pixel(), size.width),
        }
    }

    /// Returns the number of bytes spanned by the surface.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.bytes_per_line as usize * self.size.height as usize
    }
}

/// A source texture supplied by the engine.
///
/// The compositor does not own the memory. `generation` distinguishes
/// successive textures that happen to reuse the same address; the engine
/// bumps it whenever it recycles texture memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Texture {
    /// Pixel memory.
    pub surface: SurfaceDescriptor,
    /// Whether the engine marked this texture for the rotation cache.
    pub rotated: bool,
    /// Recycling generation of `surface.address`.
    pub generation: u32,
}

impl Texture {
    /// Creates an unrotated texture of generation zero.
    #[must_use]
    pub const fn new(surface: SurfaceDescriptor) -> Self {
        Self {
            surface,
            rotated: false,
            generation: 0,
        }
    }
}

/// Bit position and width of a color channel within a pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    /// Bit offset of the channel's least significant bit.
    pub offset: u8,
    /// Channel width in bits.
    pub length: u8,
}

impl ChannelLayout {
    const fn new(offset: u8, length: u8) -> Self {
        Self { offset, length }
    }
}

/// Framebuffer layout reported to host tools reading back a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferFormat {
    /// Address of the first pixel.
    pub address: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub bytes_per_line: u32,
    /// Bits per pixel.
    pub bits_per_pixel: u8,
    /// Red channel position.
    pub red: ChannelLayout,
    /// Green channel position.
    pub green: ChannelLayout,
    /// Blue channel position.
    pub blue: ChannelLayout,
    /// Byte-swap granularity (0 for none, 2 for 16-bit swaps).
    pub swap_bytes: u8,
}

impl FramebufferFormat {
    /// Describes `surface`, or returns `None` if its format has no channel
    /// layout host tools understand.
    #[must_use]
    pub fn describe(surface: &SurfaceDescriptor) -> Option<Self> {
        let (red, green, blue, swap_bytes) = match surface.format {
            PixelFormat::Argb32 | PixelFormat::Argb32Premultiplied | PixelFormat::Rgb32 => (
                ChannelLayout::new(16, 8),
                ChannelLayout::new(8, 8),
                ChannelLayout::new(0, 8),
                0,
            ),
            PixelFormat::Argb4444 | PixelFormat::Argb4444Premultiplied => (
                ChannelLayout::new(8, 4),
                ChannelLayout::new(4, 4),
                ChannelLayout::new(0, 4),
                2,
            ),
            PixelFormat::Rgb16 => (
                ChannelLayout::new(0, 5),
                ChannelLayout::new(5, 6),
                ChannelLayout::new(11, 5),
                2,
            ),
            _ => return None,
        };
        Some(Self {
            address: surface.address,
            width: surface.size.width,
            height: surface.size.height,
            bytes_per_line: surface.bytes_per_line,
            bits_per_pixel: surface.format.bits_per_pixel(),
            red,
            green,
            blue,
            swap_bytes,
        })
    }
}

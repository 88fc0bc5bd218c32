// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registered layers: shared state plus a per-kind payload.
//!
//! Everything the registry needs regardless of kind (hardware index, derived
//! properties, dirty flag, parent sprite) lives once on [`Layer`]. The few
//! operations that differ between image and item layers (size, pixel format,
//! and which memory to scan out) go through [`PlaneSource`].

use crate::format::{PixelFormat, bytes_per_line};
use crate::geometry::{Point, Size};

use super::id::SpriteId;
use super::item::ItemLayer;
use super::props::{CommonProperties, ImageLayerProperties, ItemLayerProperties};

/// Kind-specific answers to "what does this plane scan out?".
pub trait PlaneSource {
    /// Returns the engine-supplied shared properties.
    fn common(&self) -> &CommonProperties;

    /// Returns the plane's pixel size.
    fn size(&self) -> Size;

    /// Returns the plane's pixel format.
    fn format(&self) -> PixelFormat;

    /// Returns the bits per pixel of the plane's memory.
    fn bits_per_pixel(&self) -> u8;

    /// Returns the bytes per row of the plane's memory.
    fn bytes_per_line(&self) -> u32;

    /// Returns the address the controller should scan out from.
    fn scanout_address(&self) -> usize;
}

impl PlaneSource for ImageLayerProperties {
    fn common(&self) -> &CommonProperties {
        &self.common
    }

    fn size(&self) -> Size {
        self.texture.surface.size
    }

    fn format(&self) -> PixelFormat {
        self.texture.surface.format
    }

    fn bits_per_pixel(&self) -> u8 {
        self.texture.surface.format.bits_per_pixel()
    }

    fn bytes_per_line(&self) -> u32 {
        self.texture.surface.bytes_per_line
    }

    fn scanout_address(&self) -> usize {
        self.texture.surface.address
    }
}

/// An item layer's properties together with its buffers.
#[derive(Clone, Debug)]
pub struct ItemPlane {
    pub(crate) properties: ItemLayerProperties,
    pub(crate) frames: ItemLayer,
}

impl ItemPlane {
    /// Returns the engine-supplied properties.
    #[must_use]
    pub fn properties(&self) -> &ItemLayerProperties {
        &self.properties
    }

    /// Returns the buffer and swap state.
    #[must_use]
    pub fn frames(&self) -> &ItemLayer {
        &self.frames
    }
}

impl PlaneSource for ItemPlane {
    fn common(&self) -> &CommonProperties {
        &self.properties.common
    }

    fn size(&self) -> Size {
        self.properties.size
    }

    fn format(&self) -> PixelFormat {
        self.properties.color_depth.pixel_format()
    }

    fn bits_per_pixel(&self) -> u8 {
        self.properties.color_depth.bits_per_pixel()
    }

    fn bytes_per_line(&self) -> u32 {
        bytes_per_line(self.bits_per_pixel(), self.properties.size.width)
    }

    /// The back buffer: a swap programs the buffer just drawn, then flips.
    fn scanout_address(&self) -> usize {
        self.frames.back_buffer().surface.address
    }
}

/// The kind of a registered layer.
#[derive(Clone, Debug)]
pub enum LayerKind {
    /// Shows a static texture.
    Image(ImageLayerProperties),
    /// Drawn into each frame.
    Item(ItemPlane),
}

impl LayerKind {
    /// Returns the kind-specific plane operations.
    #[must_use]
    pub fn source(&self) -> &dyn PlaneSource {
        match self {
            Self::Image(p) => p,
            Self::Item(p) => p,
        }
    }
}

/// Properties after composing the parent sprite, as last programmed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveProperties {
    /// Own z plus the parent sprite's z.
    pub z: u16,
    /// Own position plus the parent's, clamped to the screen's far edges.
    pub position: Point,
    /// Own enablement and the parent's.
    pub enabled: bool,
    /// Own opacity, times the parent's when global alpha is enabled.
    pub opacity: f32,
}

/// A layer registered with the compositor.
#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) index: Option<u8>,
    pub(crate) effective: EffectiveProperties,
    pub(crate) dirty: bool,
    pub(crate) swap_frame: u32,
    pub(crate) parent: Option<SpriteId>,
    pub(crate) screen: Size,
    pub(crate) kind: LayerKind,
}

impl Layer {
    pub(crate) fn new(kind: LayerKind, screen: Size) -> Self {
        let common = *kind.source().common();
        Self {
            index: None,
            effective: EffectiveProperties {
                z: u16::from(common.z),
                position: common.position,
                enabled: common.enabled,
                opacity: common.opacity,
            },
            dirty: true,
            swap_frame: 0,
            parent: None,
            screen,
            kind,
        }
    }

    /// Returns the hardware plane index, or `None` before the first reindex.
    #[must_use]
    pub fn index(&self) -> Option<u8> {
        self.index
    }

    /// Returns the derived properties last written to the controller.
    #[must_use]
    pub fn effective(&self) -> &EffectiveProperties {
        &self.effective
    }

    /// Returns whether the layer has register writes not yet committed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the frame counter value at the layer's last commit.
    #[must_use]
    pub fn swap_frame(&self) -> u32 {
        self.swap_frame
    }

    /// Returns the sprite this layer is attached to.
    #[must_use]
    pub fn parent(&self) -> Option<SpriteId> {
        self.parent
    }

    /// Returns the size of the screen the layer was allocated on.
    #[must_use]
    pub fn screen_size(&self) -> Size {
        self.screen
    }

    /// Returns the kind-specific payload.
    #[must_use]
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Returns the kind-specific plane operations.
    #[must_use]
    pub fn source(&self) -> &dyn PlaneSource {
        self.kind.source()
    }

    /// Returns the item payload, if this is an item layer.
    #[must_use]
    pub fn item(&self) -> Option<&ItemPlane> {
        match &self.kind {
            LayerKind::Item(p) => Some(p),
            LayerKind::Image(_) => None,
        }
    }

    pub(crate) fn item_mut(&mut self) -> Option<&mut ItemPlane> {
        match &mut self.kind {
            LayerKind::Item(p) => Some(p),
            LayerKind::Image(_) => None,
        }
    }
}

// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer property sets supplied by the engine.

use crate::format::ColorDepth;
use crate::geometry::{Point, Size};
use crate::surface::Texture;

/// Properties shared by every layer kind and by sprites.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommonProperties {
    /// Top-left corner on the screen, relative to the parent sprite if any.
    pub position: Point,
    /// Stacking order; higher is nearer the viewer.
    pub z: u8,
    /// Whether the layer is shown.
    pub enabled: bool,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Engine-assigned identifier, passed through for diagnostics.
    pub platform_id: i32,
}

impl Default for CommonProperties {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            z: 0,
            enabled: true,
            opacity: 1.0,
            platform_id: 0,
        }
    }
}

/// Properties of a layer drawn into at run time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemLayerProperties {
    /// Shared properties.
    pub common: CommonProperties,
    /// Pixel size of the layer's buffers.
    pub size: Size,
    /// Requested color depth.
    pub color_depth: ColorDepth,
}

/// Properties of a layer showing a static texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageLayerProperties {
    /// Shared properties.
    pub common: CommonProperties,
    /// Texture scanned out directly.
    pub texture: Texture,
}

/// Properties of a sprite.
///
/// A sprite has no pixels of its own. Its position, z, enablement, and
/// opacity compose into every layer attached to it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpriteProperties {
    /// Shared properties.
    pub common: CommonProperties,
}

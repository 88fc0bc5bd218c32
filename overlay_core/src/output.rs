// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display output description.
//!
//! A [`Screen`] is the read-only descriptor of a panel: its pixel size and the
//! background color the engine clears to. Layers are validated and clamped
//! against the screen they were allocated on.

use crate::format::Rgba32;
use crate::geometry::Size;

/// A physical panel driven by the display controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Screen {
    /// Panel resolution in pixels.
    pub size: Size,
    /// Color shown where no layer covers the panel.
    pub background: Rgba32,
}

impl Screen {
    /// Creates a screen with a black background.
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            size,
            background: Rgba32::BLACK,
        }
    }

    /// RK055 MIPI panel, 720×1280 portrait.
    #[must_use]
    pub const fn rk055() -> Self {
        Self::new(Size::new(720, 1280))
    }

    /// RK043 panel, 540×960 portrait.
    #[must_use]
    pub const fn rk043() -> Self {
        Self::new(Size::new(540, 960))
    }

    /// Returns whether a layer of `size` fits on this screen.
    #[must_use]
    pub const fn fits(&self, size: Size) -> bool {
        self.size.contains(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_presets() {
        assert_eq!(Screen::rk055().size, Size::new(720, 1280));
        assert_eq!(Screen::rk043().size, Size::new(540, 960));
    }

    #[test]
    fn wider_layer_does_not_fit() {
        let screen = Screen::rk043();
        assert!(screen.fits(Size::new(540, 960)));
        assert!(!screen.fits(Size::new(600, 100)));
    }
}

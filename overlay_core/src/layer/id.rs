// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and sprite identity types.

use core::fmt;

/// A handle to a hardware layer in a [`LayerRegistry`](super::LayerRegistry).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a layer is deallocated and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl LayerId {
    /// Rebuilds a handle from its parts, as read back from a recorded trace.
    ///
    /// A handle built this way is only meaningful to the registry that
    /// issued the original.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a sprite in a [`LayerRegistry`](super::LayerRegistry).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpriteId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl SpriteId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpriteId({}@gen{})", self.idx, self.generation)
    }
}

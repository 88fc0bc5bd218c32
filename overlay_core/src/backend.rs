// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware contract for board integrations.
//!
//! The compositor splits board-specific work into a handful of seams. A board
//! support crate provides:
//!
//! - **Display controller**: implements [`DisplayController`] over the
//!   overlay-plane registers. Every write lands in a shadow register set and
//!   only takes effect after [`trigger_shadow_load`] for that plane followed
//!   by a vertical blank.
//!
//! - **Semaphores**: two binary semaphores implementing
//!   [`Semaphore`](crate::signal::Semaphore), one for the main loop and one
//!   for vsync.
//!
//! - **Vblank interrupt**: calls [`VsyncIrq::on_interrupt`] once per vertical
//!   blank.
//!
//! - **Memory**: [`MemoryAllocator`](crate::memory::MemoryAllocator)
//!   instances for the heap and the non-cacheable region.
//!
//! # Ordering
//!
//! Plane registers for a frame are always written before the shadow load for
//! that plane is triggered. Shadow loads for all dirty planes are issued
//! together by [`DisplayCompositor::commit`], never one by one as properties
//! change, so planes that must change together latch on the same vblank.
//!
//! [`trigger_shadow_load`]: DisplayController::trigger_shadow_load
//! [`VsyncIrq::on_interrupt`]: crate::vsync::VsyncIrq::on_interrupt
//! [`DisplayCompositor::commit`]: crate::compositor::DisplayCompositor::commit

use crate::format::ControllerFormat;
use crate::geometry::{Point, Size};

/// How a plane's alpha is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendConfig {
    /// Replace per-pixel alpha with a constant.
    GlobalAlpha(u8),
    /// Use the alpha stored in the pixels.
    Embedded,
}

/// Pixel layout of a plane's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferConfig {
    /// Scan-out format.
    pub format: ControllerFormat,
    /// Bytes per row.
    pub stride: u32,
}

/// Register-level access to the display controller's overlay planes.
///
/// `plane` is the hardware layer index, always below the configured layer
/// capacity.
pub trait DisplayController {
    /// Enables or disables a plane.
    fn enable_plane(&mut self, plane: u8, enabled: bool);

    /// Sets a plane's blend configuration.
    fn set_blend(&mut self, plane: u8, blend: BlendConfig);

    /// Sets a plane's size.
    fn set_size(&mut self, plane: u8, size: Size);

    /// Sets a plane's position on the panel.
    fn set_offset(&mut self, plane: u8, offset: Point);

    /// Sets a plane's pixel format and stride.
    fn set_buffer_config(&mut self, plane: u8, config: BufferConfig);

    /// Sets the address a plane scans out from.
    fn set_buffer_address(&mut self, plane: u8, address: usize);

    /// Latches a plane's shadow registers on the next vertical blank.
    fn trigger_shadow_load(&mut self, plane: u8);
}

impl<C: DisplayController + ?Sized> DisplayController for &mut C {
    fn enable_plane(&mut self, plane: u8, enabled: bool) {
        (**self).enable_plane(plane, enabled);
    }

    fn set_blend(&mut self, plane: u8, blend: BlendConfig) {
        (**self).set_blend(plane, blend);
    }

    fn set_size(&mut self, plane: u8, size: Size) {
        (**self).set_size(plane, size);
    }

    fn set_offset(&mut self, plane: u8, offset: Point) {
        (**self).set_offset(plane, offset);
    }

    fn set_buffer_config(&mut self, plane: u8, config: BufferConfig) {
        (**self).set_buffer_config(plane, config);
    }

    fn set_buffer_address(&mut self, plane: u8, address: usize) {
        (**self).set_buffer_address(plane, address);
    }

    fn trigger_shadow_load(&mut self, plane: u8) {
        (**self).trigger_shadow_load(plane);
    }
}

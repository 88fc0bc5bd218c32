// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Board seams.
//!
//! [`Board`] names the concrete type behind each hardware seam and provides
//! the two services the platform context calls directly: the millisecond
//! clock and data-cache maintenance. [`BoardParts`] carries the instances
//! into [`PlatformContext::new`](crate::context::PlatformContext::new).

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use overlay_core::backend::DisplayController;
use overlay_core::memory::MemoryAllocator;
use overlay_core::output::Screen;
use overlay_core::signal::Semaphore;
use overlay_core::time::Timestamp;
use overlay_core::vsync::Vsync;
use overlay_gpu::device::GpuDevice;
use overlay_gpu::engine::SoftwareRenderer;

/// The hardware a platform context runs on.
pub trait Board {
    /// Overlay-plane registers.
    type Controller: DisplayController;
    /// Binary semaphore usable from interrupt context.
    type Semaphore: Semaphore;
    /// 2D GPU.
    type Gpu: GpuDevice;
    /// CPU blending for formats the GPU cannot sample.
    type Renderer: SoftwareRenderer;
    /// Non-cacheable region for frame buffers.
    type FrameAllocator: MemoryAllocator;
    /// Rotation cache pool.
    type CacheAllocator: MemoryAllocator;
    /// General-purpose heap.
    type HeapAllocator: MemoryAllocator;
    /// Region filled once at startup.
    type PreloadAllocator: MemoryAllocator;

    /// Returns milliseconds since boot.
    fn now(&self) -> Timestamp;

    /// Cleans and invalidates the data cache over `len` bytes at `address`.
    ///
    /// `address` is aligned to a cache line.
    fn clean_invalidate_dcache(&mut self, address: usize, len: usize);
}

/// The instances behind a [`Board`]'s seams.
pub struct BoardParts<B: Board> {
    /// The board itself.
    pub board: B,
    /// Overlay-plane registers.
    pub controller: B::Controller,
    /// Semaphore the main loop sleeps on between engine updates.
    pub main_loop: B::Semaphore,
    /// Semaphore frame presentation sleeps on until vertical blank.
    pub vsync_semaphore: B::Semaphore,
    /// Frame counter shared with the vblank interrupt.
    pub vsync: Arc<Vsync>,
    /// 2D GPU.
    pub gpu: B::Gpu,
    /// CPU fallback renderer.
    pub renderer: B::Renderer,
    /// Frame buffer region.
    pub frame_allocator: B::FrameAllocator,
    /// Rotation cache pool.
    pub cache_allocator: B::CacheAllocator,
    /// General-purpose heap.
    pub heap_allocator: B::HeapAllocator,
    /// Preload region.
    pub preload_allocator: B::PreloadAllocator,
    /// Panels attached to the display controller.
    pub screens: Vec<Screen>,
}

impl<B: Board> fmt::Debug for BoardParts<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardParts")
            .field("vsync", &self.vsync)
            .field("screens", &self.screens)
            .finish_non_exhaustive()
    }
}

// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A board made of recording doubles.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::ops::Range;

use overlay_core::backend::{BlendConfig, BufferConfig, DisplayController};
use overlay_core::format::Rgba32;
use overlay_core::geometry::{Point, Rect, Size};
use overlay_core::memory::{BlockAllocator, ReversePreloadAllocator};
use overlay_core::output::Screen;
use overlay_core::signal::Semaphore;
use overlay_core::surface::{SurfaceDescriptor, Texture};
use overlay_core::time::{Timestamp, WaitTicks};
use overlay_core::vsync::Vsync;
use overlay_gpu::buffer::GpuBuffer;
use overlay_gpu::device::{
    FillRule, Filter, GpuBlend, GpuDevice, GpuError, GradientHandle, LinearGradientDesc,
};
use overlay_gpu::engine::SoftwareRenderer;
use overlay_gpu::path::PathData;
use overlay_gpu::transform::{Matrix, Transform};

use crate::board::{Board, BoardParts};

pub(crate) const FRAMES: Range<usize> = 0x2000_0000..0x2040_0000;
pub(crate) const CACHE: Range<usize> = 0x2040_0000..0x2060_0000;
pub(crate) const HEAP: Range<usize> = 0x8000_0000..0x8010_0000;
pub(crate) const PRELOAD: Range<usize> = 0x8010_0000..0x8020_0000;

/// Records waits and signals; optionally simulates one vblank per wait.
#[derive(Debug, Default)]
pub(crate) struct TestSemaphore {
    waits: RefCell<Vec<WaitTicks>>,
    signals: Cell<u32>,
    ticking: Option<Arc<Vsync>>,
}

impl TestSemaphore {
    pub(crate) fn waits(&self) -> Vec<WaitTicks> {
        self.waits.borrow().clone()
    }

    pub(crate) fn signals(&self) -> u32 {
        self.signals.get()
    }
}

impl Semaphore for TestSemaphore {
    fn wait(&self, ticks: WaitTicks) -> bool {
        self.waits.borrow_mut().push(ticks);
        if let Some(vsync) = &self.ticking {
            vsync.tick();
        }
        true
    }

    fn signal(&self) {
        self.signals.set(self.signals.get() + 1);
    }
}

/// Counts shadow loads and ignores other register writes.
#[derive(Debug, Default)]
pub(crate) struct TestController {
    pub(crate) shadow_loads: u32,
}

impl DisplayController for TestController {
    fn enable_plane(&mut self, _: u8, _: bool) {}

    fn set_blend(&mut self, _: u8, _: BlendConfig) {}

    fn set_size(&mut self, _: u8, _: Size) {}

    fn set_offset(&mut self, _: u8, _: Point) {}

    fn set_buffer_config(&mut self, _: u8, _: BufferConfig) {}

    fn set_buffer_address(&mut self, _: u8, _: usize) {}

    fn trigger_shadow_load(&mut self, _: u8) {
        self.shadow_loads += 1;
    }
}

/// Logs the name of every GPU call.
#[derive(Debug, Default)]
pub(crate) struct CallLogGpu {
    pub(crate) calls: Vec<&'static str>,
    pub(crate) fail_init: bool,
}

impl CallLogGpu {
    fn ok(&mut self, name: &'static str) -> Result<(), GpuError> {
        self.calls.push(name);
        Ok(())
    }
}

impl GpuDevice for CallLogGpu {
    fn init(&mut self, _: u32, _: u32) -> Result<(), GpuError> {
        self.calls.push("init");
        if self.fail_init {
            Err(GpuError::Sdk(-1))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {
        self.calls.push("close");
    }

    fn enable_premultiply(&mut self) -> Result<(), GpuError> {
        self.ok("enable_premultiply")
    }

    fn disable_premultiply(&mut self) {
        self.calls.push("disable_premultiply");
    }

    fn finish(&mut self) -> Result<(), GpuError> {
        self.ok("finish")
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        self.ok("flush")
    }

    fn clear(&mut self, _: &GpuBuffer, _: Rect, _: u32) -> Result<(), GpuError> {
        self.ok("clear")
    }

    fn draw(
        &mut self,
        _: &GpuBuffer,
        _: &PathData,
        _: FillRule,
        _: &Matrix,
        _: GpuBlend,
        _: u32,
    ) -> Result<(), GpuError> {
        self.ok("draw")
    }

    fn blit(
        &mut self,
        _: &GpuBuffer,
        _: &GpuBuffer,
        _: &Matrix,
        _: GpuBlend,
        _: u32,
        _: Filter,
    ) -> Result<(), GpuError> {
        self.ok("blit")
    }

    fn blit_rect(
        &mut self,
        _: &GpuBuffer,
        _: &GpuBuffer,
        _: [u32; 4],
        _: &Matrix,
        _: GpuBlend,
        _: u32,
        _: Filter,
    ) -> Result<(), GpuError> {
        self.ok("blit_rect")
    }

    fn set_scissor(&mut self, _: Rect) {
        self.calls.push("set_scissor");
    }

    fn enable_scissor(&mut self) {
        self.calls.push("enable_scissor");
    }

    fn disable_scissor(&mut self) {
        self.calls.push("disable_scissor");
    }

    fn upload_path(&mut self, _: &PathData) -> Result<(), GpuError> {
        self.ok("upload_path")
    }

    fn clear_path(&mut self, _: &PathData) -> Result<(), GpuError> {
        self.ok("clear_path")
    }

    fn create_linear_gradient(
        &mut self,
        _: &LinearGradientDesc,
    ) -> Result<GradientHandle, GpuError> {
        self.calls.push("create_linear_gradient");
        Ok(GradientHandle(1))
    }

    fn draw_linear_gradient(
        &mut self,
        _: &GpuBuffer,
        _: &PathData,
        _: FillRule,
        _: &Matrix,
        _: GradientHandle,
        _: GpuBlend,
        _: Filter,
    ) -> Result<(), GpuError> {
        self.ok("draw_linear_gradient")
    }

    fn release_linear_gradient(&mut self, _: GradientHandle) {
        self.calls.push("release_linear_gradient");
    }
}

/// A software renderer that draws nothing.
#[derive(Debug, Default)]
pub(crate) struct NullRenderer;

impl SoftwareRenderer for NullRenderer {
    fn blend_image(&mut self, _: &SurfaceDescriptor, _: &Texture, _: Point, _: Rect, _: u16) {}

    fn blend_alpha_map(
        &mut self,
        _: &SurfaceDescriptor,
        _: &Texture,
        _: Point,
        _: Rect,
        _: Rgba32,
        _: u16,
    ) {
    }

    fn blend_transformed(
        &mut self,
        _: &SurfaceDescriptor,
        _: &Texture,
        _: &Transform,
        _: kurbo::Point,
        _: kurbo::Rect,
        _: Rect,
        _: Rgba32,
        _: u16,
    ) {
    }
}

/// A board with a settable clock that records cache maintenance.
#[derive(Debug, Default)]
pub(crate) struct TestBoard {
    pub(crate) clock: Cell<u64>,
    pub(crate) flushes: Vec<(usize, usize)>,
}

impl Board for TestBoard {
    type Controller = TestController;
    type Semaphore = TestSemaphore;
    type Gpu = CallLogGpu;
    type Renderer = NullRenderer;
    type FrameAllocator = BlockAllocator;
    type CacheAllocator = BlockAllocator;
    type HeapAllocator = BlockAllocator;
    type PreloadAllocator = ReversePreloadAllocator;

    fn now(&self) -> Timestamp {
        Timestamp(self.clock.get())
    }

    fn clean_invalidate_dcache(&mut self, address: usize, len: usize) {
        self.flushes.push((address, len));
    }
}

fn block(range: Range<usize>, block_size: usize) -> BlockAllocator {
    BlockAllocator::new(range.start, range.len(), block_size)
}

/// Parts for a [`TestBoard`] with one RK055 panel. Every vsync wait
/// simulates a vertical blank.
pub(crate) fn parts() -> BoardParts<TestBoard> {
    let vsync = Arc::new(Vsync::new());
    BoardParts {
        board: TestBoard::default(),
        controller: TestController::default(),
        main_loop: TestSemaphore::default(),
        vsync_semaphore: TestSemaphore {
            ticking: Some(Arc::clone(&vsync)),
            ..TestSemaphore::default()
        },
        vsync,
        gpu: CallLogGpu::default(),
        renderer: NullRenderer,
        frame_allocator: block(FRAMES, 64),
        cache_allocator: block(CACHE, 64),
        heap_allocator: block(HEAP, 16),
        preload_allocator: ReversePreloadAllocator::new(PRELOAD.start, PRELOAD.len()),
        screens: vec![Screen::rk055()],
    }
}

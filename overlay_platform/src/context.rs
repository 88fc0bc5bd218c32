// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The platform context the GUI engine drives.
//!
//! [`PlatformContext`] owns the [`DisplayCompositor`] and the
//! [`DrawingEngine`] and adds what neither knows about: the main-loop
//! schedule, frame phase timing, memory-region routing, and the cache
//! barriers the engine needs before the GPU or the display controller reads
//! CPU-written memory.
//!
//! The main loop is [`run_once`](PlatformContext::run_once) in a loop: run
//! the engine update if it is due, then sleep on the main-loop semaphore
//! until the next scheduled update or until something resumes it early.
//! [`schedule_engine_update`](PlatformContext::schedule_engine_update) moves
//! the deadline from task context; interrupt handlers use a [`MainLoopWaker`]
//! instead.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use overlay_core::compositor::DisplayCompositor;
use overlay_core::config::CompositorConfig;
use overlay_core::layer::LayerId;
use overlay_core::memory::{AllocationType, MemoryAllocator};
use overlay_core::output::Screen;
use overlay_core::signal::{Semaphore, SemaphoreKind, Suspension};
use overlay_core::surface::SurfaceDescriptor;
use overlay_core::time::{Timebase, Timeout, Timestamp};
#[cfg(feature = "trace")]
use overlay_core::trace::TraceBuffer;
use overlay_core::trace::{
    FrameSummary, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer,
};
use overlay_core::vsync::VsyncIrq;
use overlay_gpu::config::GpuConfig;
use overlay_gpu::engine::DrawingEngine;

use crate::board::{Board, BoardParts};

/// Data-cache line size on the Cortex-M7.
pub const CACHE_LINE: usize = 32;

/// How the engine should treat a layer's frame buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameBufferingType {
    /// Two buffers whose roles swap on every presented frame.
    FlippedDoubleBuffering,
}

/// Timing feedback returned from [`PlatformContext::present_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameStatistics {
    /// Milliseconds between the last two refreshes.
    pub refresh_delta: i32,
    /// Milliseconds left in the frame budget.
    pub remaining_budget: i32,
}

impl Default for FrameStatistics {
    fn default() -> Self {
        Self {
            refresh_delta: 0,
            remaining_budget: i32::MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// MainLoopWaker
// ---------------------------------------------------------------------------

/// Interrupt-safe handle that forces an early engine update.
///
/// [`wake`](Self::wake) sets a flag the next
/// [`update`](PlatformContext::update) consumes and resumes the main-loop
/// semaphore, so a sleeping [`run_once`](PlatformContext::run_once) returns
/// and runs the engine regardless of the scheduled deadline.
#[derive(Debug)]
pub struct MainLoopWaker<S> {
    requested: Arc<AtomicBool>,
    suspension: Arc<Suspension<S>>,
}

impl<S> Clone for MainLoopWaker<S> {
    fn clone(&self) -> Self {
        Self {
            requested: Arc::clone(&self.requested),
            suspension: Arc::clone(&self.suspension),
        }
    }
}

impl<S: Semaphore> MainLoopWaker<S> {
    /// Requests an engine update as soon as possible.
    ///
    /// Callable from interrupt context.
    pub fn wake(&self) {
        self.requested.store(true, Ordering::Release);
        self.suspension.resume(SemaphoreKind::MainLoop);
    }
}

// ---------------------------------------------------------------------------
// PhaseLog
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum PhaseRecord {
    Begin(PhaseBeginEvent),
    End(PhaseEndEvent),
    Summary(FrameSummary),
}

/// Most phase records kept between drains; the oldest are evicted first.
#[cfg(feature = "trace")]
const PHASE_LOG_CAPACITY: usize = TraceBuffer::DEFAULT_CAPACITY;

/// Phase events waiting to be drained, as a fixed-capacity ring. Empty
/// without the `trace` feature.
#[derive(Debug, Default)]
struct PhaseLog {
    records: VecDeque<PhaseRecord>,
}

impl PhaseLog {
    #[inline]
    fn record(&mut self, r: PhaseRecord) {
        #[cfg(feature = "trace")]
        {
            if self.records.len() >= PHASE_LOG_CAPACITY {
                self.records.pop_front();
            }
            self.records.push_back(r);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = r;
        }
    }

    fn drain_into(&mut self, tracer: &mut Tracer<'_>) {
        for r in self.records.drain(..) {
            match r {
                PhaseRecord::Begin(e) => tracer.phase_begin(&e),
                PhaseRecord::End(e) => tracer.phase_end(&e),
                PhaseRecord::Summary(s) => tracer.frame_summary(&s),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PlatformContext
// ---------------------------------------------------------------------------

/// The compositor of layers, the drawing engine, and the main loop for one
/// board.
pub struct PlatformContext<B: Board> {
    board: B,
    compositor: DisplayCompositor<B::Controller, B::Semaphore, B::FrameAllocator>,
    engine: DrawingEngine<B::Gpu, B::Renderer, B::CacheAllocator>,
    heap: B::HeapAllocator,
    preload: B::PreloadAllocator,
    screens: Vec<Screen>,
    next_update: Timestamp,
    wake_requested: Arc<AtomicBool>,
    frame: Option<FrameSummaryBuilder>,
    phases: PhaseLog,
}

impl<B: Board> fmt::Debug for PlatformContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformContext")
            .field("screens", &self.screens)
            .field("next_update", &self.next_update)
            .field("current_frame", &self.compositor.current_frame())
            .field("frame_open", &self.frame.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: Board> PlatformContext<B> {
    /// Wires a board's parts into a context.
    ///
    /// The GPU is not touched until [`initialize`](Self::initialize).
    pub fn new(parts: BoardParts<B>, config: CompositorConfig, gpu: GpuConfig) -> Self {
        let BoardParts {
            board,
            controller,
            main_loop,
            vsync_semaphore,
            vsync,
            gpu: device,
            renderer,
            frame_allocator,
            cache_allocator,
            heap_allocator,
            preload_allocator,
            screens,
        } = parts;
        let suspension = Arc::new(Suspension::new(
            main_loop,
            vsync_semaphore,
            Timebase {
                tick_period_ms: config.tick_period_ms,
            },
        ));
        let compositor =
            DisplayCompositor::new(controller, frame_allocator, suspension, vsync, config);
        let engine = DrawingEngine::new(device, renderer, cache_allocator, gpu);
        Self {
            board,
            compositor,
            engine,
            heap: heap_allocator,
            preload: preload_allocator,
            screens,
            next_update: Timestamp::default(),
            wake_requested: Arc::new(AtomicBool::new(false)),
            frame: None,
            phases: PhaseLog::default(),
        }
    }

    /// Brings up the GPU.
    ///
    /// # Panics
    ///
    /// Halts with `GpuInitializationFailed` if the GPU driver cannot start.
    pub fn initialize(&mut self) {
        self.engine.init();
        log::debug!(
            "platform initialized: {} screen(s), {} planes",
            self.screens.len(),
            self.compositor.registry().config().max_layer_count
        );
    }

    // -- Accessors ---------------------------------------------------------

    /// Returns the board.
    #[must_use]
    pub fn board(&self) -> &B {
        &self.board
    }

    /// Returns the board mutably.
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Returns the layer compositor, which implements
    /// [`LayerEngine`](overlay_core::compositor::LayerEngine).
    pub fn layer_engine(
        &mut self,
    ) -> &mut DisplayCompositor<B::Controller, B::Semaphore, B::FrameAllocator> {
        &mut self.compositor
    }

    /// Returns the layer compositor.
    #[must_use]
    pub fn compositor(&self) -> &DisplayCompositor<B::Controller, B::Semaphore, B::FrameAllocator> {
        &self.compositor
    }

    /// Returns the drawing engine.
    pub fn drawing_engine(&mut self) -> &mut DrawingEngine<B::Gpu, B::Renderer, B::CacheAllocator> {
        &mut self.engine
    }

    /// Returns the screens attached to the display controller.
    #[must_use]
    pub fn available_screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Returns the buffering scheme of `layer`.
    #[must_use]
    pub fn frame_buffering_type(&self, layer: LayerId) -> FrameBufferingType {
        _ = layer;
        FrameBufferingType::FlippedDoubleBuffering
    }

    /// Returns the vblank interrupt handler.
    pub fn irq_handle(&self) -> VsyncIrq<B::Semaphore> {
        self.compositor.irq_handle()
    }

    /// Returns a handle interrupt handlers use to wake the main loop.
    pub fn main_loop_waker(&self) -> MainLoopWaker<B::Semaphore> {
        MainLoopWaker {
            requested: Arc::clone(&self.wake_requested),
            suspension: Arc::clone(self.compositor.suspension()),
        }
    }

    // -- Main loop ---------------------------------------------------------

    /// Returns milliseconds since boot.
    #[must_use]
    pub fn current_timestamp(&self) -> Timestamp {
        self.board.now()
    }

    /// Returns when the engine next wants to run.
    #[must_use]
    pub fn next_update(&self) -> Timestamp {
        self.next_update
    }

    /// Schedules the next engine update at `at`.
    ///
    /// If `at` is already due the main loop is resumed so a sleeping
    /// [`run_once`](Self::run_once) returns immediately.
    pub fn schedule_engine_update(&mut self, at: Timestamp) {
        self.next_update = at;
        if self.board.now() >= at {
            self.compositor.suspension().resume(SemaphoreKind::MainLoop);
        }
    }

    /// Runs `engine_update` if the scheduled update is due or a wake was
    /// requested, then returns the next scheduled update.
    ///
    /// The callback receives the context and the current time. It usually
    /// draws a frame and calls [`schedule_engine_update`](Self::schedule_engine_update).
    pub fn update<F>(&mut self, engine_update: &mut F) -> Timestamp
    where
        F: FnMut(&mut Self, Timestamp),
    {
        let now = self.board.now();
        let woken = self.wake_requested.swap(false, Ordering::AcqRel);
        if woken || now >= self.next_update {
            engine_update(self, now);
        }
        self.next_update
    }

    /// One pass of the main loop: update, then sleep until the next update
    /// is due or the main loop is resumed.
    ///
    /// Returns the next scheduled update.
    pub fn run_once<F>(&mut self, engine_update: &mut F) -> Timestamp
    where
        F: FnMut(&mut Self, Timestamp),
    {
        let next = self.update(engine_update);
        let now = self.board.now();
        if next > now && !self.wake_requested.load(Ordering::Acquire) {
            let timeout = Timeout::from_millis(next.saturating_millis_since(now));
            self.compositor
                .suspension()
                .suspend(SemaphoreKind::MainLoop, timeout);
        }
        next
    }

    /// Runs the main loop forever.
    pub fn run<F>(&mut self, mut engine_update: F) -> !
    where
        F: FnMut(&mut Self, Timestamp),
    {
        loop {
            self.run_once(&mut engine_update);
        }
    }

    // -- Frame lifecycle ---------------------------------------------------

    /// Starts drawing into `layer` and returns its back buffer.
    ///
    /// Blocks until the buffer is free (see
    /// [`DisplayCompositor::begin_frame`]) and binds it as the drawing
    /// engine's target.
    pub fn begin_frame(&mut self, layer: LayerId, refresh_interval: i32) -> SurfaceDescriptor {
        if self.frame.is_none() {
            self.frame = Some(FrameSummaryBuilder::new(self.compositor.current_frame()));
        }
        self.phase_begin(PhaseKind::BeginFrame);
        let surface = self.compositor.begin_frame(layer, refresh_interval);
        self.engine.set_buffer(surface);
        self.phase_end(PhaseKind::BeginFrame);
        self.phase_begin(PhaseKind::Draw);
        surface
    }

    /// Finishes drawing into `layer` and schedules its swap.
    pub fn end_frame(&mut self, layer: LayerId) {
        self.phase_end(PhaseKind::Draw);
        self.phase_begin(PhaseKind::EndFrame);
        self.engine.flush();
        self.compositor.end_frame(layer);
        self.phase_end(PhaseKind::EndFrame);
    }

    /// Waits for the GPU and commits every pending plane change.
    pub fn present_frame(&mut self) -> FrameStatistics {
        self.phase_begin(PhaseKind::Present);
        self.engine.finish();
        let committed = self.compositor.commit();
        self.phase_end(PhaseKind::Present);
        if let Some(mut builder) = self.frame.take() {
            builder.set_committed(committed);
            let summary = builder.finish();
            log::trace!(
                "frame {}: begin {}ms, draw {}ms, end {}ms, present {}ms, {} committed",
                summary.frame,
                summary.begin_ms,
                summary.draw_ms,
                summary.end_ms,
                summary.present_ms,
                summary.committed
            );
            self.phases.record(PhaseRecord::Summary(summary));
        }
        FrameStatistics::default()
    }

    fn phase_begin(&mut self, phase: PhaseKind) {
        let timestamp = self.board.now();
        if let Some(builder) = &mut self.frame {
            builder.phase_begin(phase, timestamp);
        }
        self.phases.record(PhaseRecord::Begin(PhaseBeginEvent {
            frame: self.compositor.current_frame(),
            phase,
            timestamp,
        }));
    }

    fn phase_end(&mut self, phase: PhaseKind) {
        let timestamp = self.board.now();
        if let Some(builder) = &mut self.frame {
            builder.phase_end(phase, timestamp);
        }
        self.phases.record(PhaseRecord::End(PhaseEndEvent {
            frame: self.compositor.current_frame(),
            phase,
            timestamp,
        }));
    }

    // -- Memory ------------------------------------------------------------

    /// Returns the allocator for a memory region.
    ///
    /// [`AllocationType::Custom`] is the rotation cache pool, which the
    /// drawing engine owns, so it is not handed out.
    pub fn memory_allocator(&mut self, kind: AllocationType) -> Option<&mut dyn MemoryAllocator> {
        match kind {
            AllocationType::Default => Some(&mut self.heap),
            AllocationType::NonCacheable => Some(self.compositor.allocator_mut()),
            AllocationType::DefaultPreload => Some(&mut self.preload),
            AllocationType::Custom => {
                log::debug!("custom pool is reserved for the rotation cache");
                None
            }
        }
    }

    /// Waits until nothing reads the memory in `begin..end` asynchronously.
    ///
    /// Drops any rotated copy of the texture at `begin` and drains the GPU.
    pub fn wait_until_async_read_finished(&mut self, begin: usize, end: usize) {
        _ = end;
        self.engine.remove_texture(begin);
        self.engine.finish();
    }

    /// Writes back CPU-cached data in `address..address + len` before an
    /// asynchronous reader consumes it.
    pub fn flush_caches_for_async_read(&mut self, address: usize, len: usize) {
        let aligned = address & !(CACHE_LINE - 1);
        let len = len + (address - aligned);
        self.board.clean_invalidate_dcache(aligned, len);
    }

    // -- Tracing -----------------------------------------------------------

    /// Forwards compositor, cache, and phase events into `tracer`.
    pub fn drain_trace(&mut self, tracer: &mut Tracer<'_>) {
        self.compositor.drain_trace(tracer);
        self.engine.drain_trace(tracer);
        self.phases.drain_into(tracer);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestBoard, parts};
    use overlay_core::compositor::LayerEngine;
    use overlay_core::format::ColorDepth;
    use overlay_core::geometry::Size;
    use overlay_core::layer::{ASAP, CommonProperties, ItemLayerProperties};
    use overlay_core::time::WaitTicks;

    fn context() -> PlatformContext<TestBoard> {
        let mut ctx = PlatformContext::new(parts(), CompositorConfig::rt1170(), GpuConfig::rt1170());
        ctx.initialize();
        ctx
    }

    fn item_layer(ctx: &mut PlatformContext<TestBoard>) -> LayerId {
        let screen = ctx.available_screens()[0];
        let props = ItemLayerProperties {
            common: CommonProperties::default(),
            size: Size::new(64, 32),
            color_depth: ColorDepth::Bpp32,
        };
        ctx.layer_engine()
            .allocate_item_layer(&screen, props, None)
            .unwrap()
    }

    fn main_loop_waits(ctx: &PlatformContext<TestBoard>) -> Vec<WaitTicks> {
        ctx.compositor()
            .suspension()
            .semaphore(SemaphoreKind::MainLoop)
            .waits()
    }

    #[test]
    fn update_runs_engine_only_when_due() {
        let mut ctx = context();
        ctx.board().clock.set(10);
        ctx.schedule_engine_update(Timestamp(50));

        let mut calls = 0;
        let next = ctx.update(&mut |_, _| calls += 1);
        assert_eq!(calls, 0, "update not due yet");
        assert_eq!(next, Timestamp(50));

        ctx.board().clock.set(50);
        let next = ctx.update(&mut |ctx: &mut PlatformContext<TestBoard>, now| {
            calls += 1;
            ctx.schedule_engine_update(now.saturating_add_millis(16));
        });
        assert_eq!(calls, 1, "update due at the deadline");
        assert_eq!(next, Timestamp(66));
    }

    #[test]
    fn scheduling_a_due_update_resumes_main_loop() {
        let mut ctx = context();
        ctx.board().clock.set(100);
        ctx.schedule_engine_update(Timestamp(200));
        let sem = ctx
            .compositor()
            .suspension()
            .semaphore(SemaphoreKind::MainLoop);
        assert_eq!(sem.signals(), 0);

        ctx.schedule_engine_update(Timestamp(100));
        let sem = ctx
            .compositor()
            .suspension()
            .semaphore(SemaphoreKind::MainLoop);
        assert_eq!(sem.signals(), 1);
    }

    #[test]
    fn run_once_sleeps_until_next_update() {
        let mut ctx = context();
        ctx.board().clock.set(1_000);
        let next = ctx.run_once(&mut |ctx: &mut PlatformContext<TestBoard>, now| {
            ctx.schedule_engine_update(now.saturating_add_millis(40));
        });
        assert_eq!(next, Timestamp(1_040));
        assert_eq!(main_loop_waits(&ctx), [WaitTicks::Ticks(40)]);
    }

    #[test]
    fn run_once_does_not_sleep_when_already_due() {
        let mut ctx = context();
        ctx.board().clock.set(5);
        ctx.run_once(&mut |_, _| {});
        assert!(main_loop_waits(&ctx).is_empty(), "next update already due");
    }

    #[test]
    fn waker_forces_an_early_update() {
        let mut ctx = context();
        ctx.schedule_engine_update(Timestamp(500));
        let waker = ctx.main_loop_waker();
        waker.wake();

        let mut calls = 0;
        ctx.run_once(&mut |_, _| calls += 1);
        assert_eq!(calls, 1, "wake overrides the schedule");
        assert_eq!(main_loop_waits(&ctx), [WaitTicks::Ticks(500)]);

        ctx.update(&mut |_, _| calls += 1);
        assert_eq!(calls, 1, "wake is consumed once");
    }

    #[test]
    fn frame_cycle_binds_flushes_and_commits() {
        let mut ctx = context();
        let layer = item_layer(&mut ctx);
        ctx.present_frame();
        let before = ctx.compositor().registry().controller().shadow_loads;

        let surface = ctx.begin_frame(layer, ASAP);
        assert_eq!(ctx.drawing_engine().buffer(), Some(&surface));

        ctx.end_frame(layer);
        assert_eq!(ctx.drawing_engine().device().calls.last(), Some(&"flush"));

        let stats = ctx.present_frame();
        assert_eq!(stats, FrameStatistics::default());
        assert_eq!(ctx.drawing_engine().device().calls.last(), Some(&"finish"));
        let after = ctx.compositor().registry().controller().shadow_loads;
        assert!(after > before, "present commits the swapped buffer");
        assert_eq!(ctx.compositor().front_buffer(layer), surface);
    }

    #[test]
    fn cache_flush_aligns_to_cache_lines() {
        let mut ctx = context();
        ctx.flush_caches_for_async_read(0x2000_1005, 10);
        ctx.flush_caches_for_async_read(0x2000_2000, 64);
        assert_eq!(
            ctx.board().flushes,
            [(0x2000_1000, 15), (0x2000_2000, 64)],
            "start rounds down and length widens"
        );
    }

    #[test]
    fn async_read_barrier_drains_gpu() {
        let mut ctx = context();
        ctx.wait_until_async_read_finished(0x3000_0000, 0x3000_1000);
        assert_eq!(ctx.drawing_engine().device().calls.last(), Some(&"finish"));
    }

    #[test]
    fn memory_allocator_routes_regions() {
        let mut ctx = context();
        let heap = ctx
            .memory_allocator(AllocationType::Default)
            .unwrap()
            .aligned_alloc(4, 100)
            .unwrap();
        assert!(crate::testing::HEAP.contains(&heap.address));

        let nc = ctx
            .memory_allocator(AllocationType::NonCacheable)
            .unwrap()
            .aligned_alloc(32, 100)
            .unwrap();
        assert!(crate::testing::FRAMES.contains(&nc.address));

        let preload = ctx
            .memory_allocator(AllocationType::DefaultPreload)
            .unwrap()
            .aligned_alloc(16, 0x100)
            .unwrap();
        assert_eq!(preload.address, crate::testing::PRELOAD.end - 0x100);

        assert!(ctx.memory_allocator(AllocationType::Custom).is_none());
    }

    #[test]
    fn every_layer_flips_double_buffers() {
        let mut ctx = context();
        let layer = item_layer(&mut ctx);
        assert_eq!(
            ctx.frame_buffering_type(layer),
            FrameBufferingType::FlippedDoubleBuffering
        );
        assert_eq!(ctx.available_screens(), [Screen::rk055()]);
    }

    #[test]
    #[should_panic(expected = "fatal error: gpu initialization failed")]
    fn gpu_init_failure_is_fatal() {
        let mut parts = parts();
        parts.gpu.fail_init = true;
        let mut ctx = PlatformContext::new(parts, CompositorConfig::rt1170(), GpuConfig::rt1170());
        ctx.initialize();
    }

    #[cfg(feature = "trace")]
    #[test]
    fn phases_and_summary_are_traced() {
        use overlay_core::trace::TraceSink;

        #[derive(Default)]
        struct Phases {
            begins: Vec<PhaseKind>,
            ends: Vec<PhaseKind>,
            summaries: Vec<FrameSummary>,
        }

        impl TraceSink for Phases {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.begins.push(e.phase);
            }

            fn on_phase_end(&mut self, e: &PhaseEndEvent) {
                self.ends.push(e.phase);
            }

            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.summaries.push(*s);
            }
        }

        let mut ctx = context();
        let layer = item_layer(&mut ctx);
        ctx.present_frame();
        let mut sink = Phases::default();
        ctx.drain_trace(&mut Tracer::new(&mut sink));
        sink.begins.clear();
        sink.ends.clear();

        ctx.board().clock.set(10);
        ctx.begin_frame(layer, ASAP);
        ctx.board().clock.set(14);
        ctx.end_frame(layer);
        ctx.present_frame();
        ctx.drain_trace(&mut Tracer::new(&mut sink));

        assert_eq!(sink.begins, PhaseKind::ALL);
        assert_eq!(sink.ends, PhaseKind::ALL);
        assert_eq!(sink.summaries.len(), 1);
        assert_eq!(sink.summaries[0].draw_ms, 4);
        assert_eq!(sink.summaries[0].committed, 1);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn phase_log_keeps_only_the_newest_records() {
        use overlay_core::trace::TraceSink;

        struct Frames(Vec<u32>);
        impl TraceSink for Frames {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.0.push(e.frame);
            }
        }

        let mut log = PhaseLog::default();
        let total = u32::try_from(PHASE_LOG_CAPACITY).unwrap() + 10;
        for frame in 0..total {
            log.record(PhaseRecord::Begin(PhaseBeginEvent {
                frame,
                phase: PhaseKind::Draw,
                timestamp: Timestamp(u64::from(frame)),
            }));
        }
        assert_eq!(log.records.len(), PHASE_LOG_CAPACITY, "log is bounded");

        let mut sink = Frames(Vec::new());
        log.drain_into(&mut Tracer::new(&mut sink));
        assert_eq!(sink.0.len(), PHASE_LOG_CAPACITY);
        assert_eq!(sink.0.first(), Some(&10), "oldest records were evicted");
        assert_eq!(sink.0.last(), Some(&(total - 1)));
        assert!(log.records.is_empty(), "drain empties the log");
    }
}

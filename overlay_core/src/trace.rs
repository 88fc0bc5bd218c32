// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the compositor.
//!
//! This module provides a [`TraceSink`] trait with per-event methods. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! Deep inside the registry and the rotation cache there is no sink to call,
//! so those components record into a [`TraceBuffer`], which the frame loop
//! drains into a [`Tracer`] once per frame. The frame loop emits phase events
//! directly.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method and [`TraceBuffer::record`] compile to
//! nothing (zero overhead). When **on**, each method performs a single
//! `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies and event buffering.
//! - `trace-rich` (implies `trace`): additionally records one
//!   [`ReindexEvent`] per plane index change.

use alloc::collections::VecDeque;

use crate::layer::LayerId;
use crate::time::Timestamp;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the frame cycle is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// `begin_frame`, including any wait for the back buffer to leave scan-out.
    BeginFrame,
    /// Drawing into the back buffer.
    Draw,
    /// `end_frame`, including the wait for the target frame.
    EndFrame,
    /// GPU finish and commit of dirty planes.
    Present,
}

impl PhaseKind {
    /// All phases in frame order.
    pub const ALL: [Self; 4] = [Self::BeginFrame, Self::Draw, Self::EndFrame, Self::Present];

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeginFrame => "begin_frame",
            Self::Draw => "draw",
            Self::EndFrame => "end_frame",
            Self::Present => "present",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::BeginFrame => 0,
            Self::Draw => 1,
            Self::EndFrame => 2,
            Self::Present => 3,
        }
    }
}

/// The kind of a layer, as reported in events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKindTag {
    /// Static texture layer.
    Image,
    /// Double-buffered drawn layer.
    Item,
}

/// What happened in the rotation cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheAction {
    /// A transformed copy was created.
    Added,
    /// A lookup found an existing copy.
    Hit,
    /// The least recently used copy was dropped to make room.
    Evicted,
    /// A texture was too large for the whole cache.
    Rejected,
    /// A copy was dropped on request.
    Removed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a layer is registered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerAllocatedEvent {
    /// The new layer.
    pub layer: LayerId,
    /// Its kind.
    pub kind: LayerKindTag,
    /// Plane index assigned.
    pub index: Option<u8>,
    /// Effective z.
    pub z: u16,
}

/// Emitted when a layer is deallocated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerReleasedEvent {
    /// The released layer.
    pub layer: LayerId,
    /// Plane index it held.
    pub index: Option<u8>,
}

/// Emitted when a plane index changes (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReindexEvent {
    /// The moved layer.
    pub layer: LayerId,
    /// Previous index.
    pub from: Option<u8>,
    /// New index.
    pub to: u8,
}

/// Emitted when dirty planes are committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommitEvent {
    /// Frame counter at commit.
    pub frame: u32,
    /// Number of planes whose shadow load was triggered.
    pub committed: u32,
}

/// Emitted when an item layer swaps buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapEvent {
    /// The swapping layer.
    pub layer: LayerId,
    /// Frame counter at swap.
    pub frame: u32,
    /// Frame the swap was scheduled for.
    pub target_frame: u32,
    /// Buffer now handed to the controller.
    pub buffer: u8,
}

/// Emitted on rotation cache activity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheEvent {
    /// What happened.
    pub action: CacheAction,
    /// Source texture address.
    pub key: usize,
    /// Size of the entry in bytes.
    pub bytes: usize,
    /// Total resident bytes after the action.
    pub resident_bytes: usize,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame: u32,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Time at the start of the phase.
    pub timestamp: Timestamp,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame: u32,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Time at the end of the phase.
    pub timestamp: Timestamp,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSummary {
    /// Frame counter at the start of the frame.
    pub frame: u32,
    /// Time spent in `begin_frame` (ms).
    pub begin_ms: u64,
    /// Time spent drawing (ms).
    pub draw_ms: u64,
    /// Time spent in `end_frame` (ms).
    pub end_ms: u64,
    /// Time spent presenting (ms).
    pub present_ms: u64,
    /// Planes committed by the present.
    pub committed: u32,
}

/// An event recorded into a [`TraceBuffer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraceEvent {
    /// See [`LayerAllocatedEvent`].
    LayerAllocated(LayerAllocatedEvent),
    /// See [`LayerReleasedEvent`].
    LayerReleased(LayerReleasedEvent),
    /// See [`ReindexEvent`].
    #[cfg(feature = "trace-rich")]
    Reindex(ReindexEvent),
    /// See [`CommitEvent`].
    Commit(CommitEvent),
    /// See [`SwapEvent`].
    Swap(SwapEvent),
    /// See [`CacheEvent`].
    Cache(CacheEvent),
}

// ---------------------------------------------------------------------------
// TraceSink
// ---------------------------------------------------------------------------

/// Receives compositor events.
///
/// Every method has a no-op default.
pub trait TraceSink {
    /// Called when a layer is registered.
    fn on_layer_allocated(&mut self, e: &LayerAllocatedEvent) {
        _ = e;
    }

    /// Called when a layer is deallocated.
    fn on_layer_released(&mut self, e: &LayerReleasedEvent) {
        _ = e;
    }

    /// Called when a plane index changes.
    #[cfg(feature = "trace-rich")]
    fn on_reindex(&mut self, e: &ReindexEvent) {
        _ = e;
    }

    /// Called when dirty planes are committed.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called when an item layer swaps buffers.
    fn on_swap(&mut self, e: &SwapEvent) {
        _ = e;
    }

    /// Called on rotation cache activity.
    fn on_cache(&mut self, e: &CacheEvent) {
        _ = e;
    }

    /// Called at the start of a frame phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called once per presented frame.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

/// A sink that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self::from_option(Some(sink))
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::from_option(None)
    }

    /// Creates a tracer from an optional sink.
    #[inline]
    #[must_use]
    pub fn from_option(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Dispatches a buffered event.
    #[inline]
    pub fn event(&mut self, e: &TraceEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            match e {
                TraceEvent::LayerAllocated(e) => s.on_layer_allocated(e),
                TraceEvent::LayerReleased(e) => s.on_layer_released(e),
                #[cfg(feature = "trace-rich")]
                TraceEvent::Reindex(e) => s.on_reindex(e),
                TraceEvent::Commit(e) => s.on_commit(e),
                TraceEvent::Swap(e) => s.on_swap(e),
                TraceEvent::Cache(e) => s.on_cache(e),
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a phase-begin event.
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a phase-end event.
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a frame summary.
    #[inline]
    pub fn frame_summary(&mut self, summary: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_summary(summary);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = summary;
        }
    }
}

// ---------------------------------------------------------------------------
// TraceBuffer
// ---------------------------------------------------------------------------

/// Events recorded by a component, waiting to be drained into a [`Tracer`].
///
/// The buffer is a fixed-capacity ring: once full, each new event evicts the
/// oldest pending one, so a component that is never drained holds at most
/// [`capacity`](Self::capacity) events.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    events: VecDeque<TraceEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceBuffer {
    /// Pending events kept by [`new`](Self::new).
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates an empty buffer holding up to [`DEFAULT_CAPACITY`] events.
    ///
    /// [`DEFAULT_CAPACITY`]: Self::DEFAULT_CAPACITY
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty buffer holding up to `capacity` events, at least one.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: if capacity == 0 { 1 } else { capacity },
            dropped: 0,
        }
    }

    /// Records an event, evicting the oldest one if the ring is full.
    /// Compiles to nothing without the `trace` feature.
    #[inline]
    pub fn record(&mut self, e: TraceEvent) {
        #[cfg(feature = "trace")]
        {
            if self.events.len() >= self.capacity {
                self.events.pop_front();
                self.dropped += 1;
            }
            self.events.push_back(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the most events the buffer holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many events were evicted unread since creation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Dispatches and clears every pending event, oldest first.
    pub fn drain_into(&mut self, tracer: &mut Tracer<'_>) {
        for e in self.events.drain(..) {
            tracer.event(&e);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame: u32,
    starts: [Option<Timestamp>; 4],
    ends: [Option<Timestamp>; 4],
    committed: u32,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for `frame`.
    #[must_use]
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            starts: [None; 4],
            ends: [None; 4],
            committed: 0,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: Timestamp) {
        self.starts[phase.slot()] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: Timestamp) {
        self.ends[phase.slot()] = Some(t);
    }

    /// Sets the number of committed planes.
    pub fn set_committed(&mut self, committed: u32) {
        self.committed = committed;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame: self.frame,
            begin_ms: self.duration(PhaseKind::BeginFrame),
            draw_ms: self.duration(PhaseKind::Draw),
            end_ms: self.duration(PhaseKind::EndFrame),
            present_ms: self.duration(PhaseKind::Present),
            committed: self.committed,
        }
    }

    fn duration(&self, phase: PhaseKind) -> u64 {
        match (self.starts[phase.slot()], self.ends[phase.slot()]) {
            (Some(start), Some(end)) => end.saturating_millis_since(start),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

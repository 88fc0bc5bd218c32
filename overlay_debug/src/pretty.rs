// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use overlay_core::trace::{
    CacheEvent, CommitEvent, FrameSummary, LayerAllocatedEvent, LayerReleasedEvent,
    PhaseBeginEvent, PhaseEndEvent, ReindexEvent, SwapEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn index(index: Option<u8>) -> String {
    index.map_or_else(|| "-".to_owned(), |i| i.to_string())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_layer_allocated(&mut self, e: &LayerAllocatedEvent) {
        let _ = writeln!(
            self.writer,
            "[layer:alloc] {:?} {:?} index={} z={}",
            e.layer,
            e.kind,
            index(e.index),
            e.z,
        );
    }

    fn on_layer_released(&mut self, e: &LayerReleasedEvent) {
        let _ = writeln!(
            self.writer,
            "[layer:free] {:?} index={}",
            e.layer,
            index(e.index),
        );
    }

    fn on_reindex(&mut self, e: &ReindexEvent) {
        let _ = writeln!(
            self.writer,
            "[reindex] {:?} {} -> {}",
            e.layer,
            index(e.from),
            e.to,
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] frame={} planes={}",
            e.frame, e.committed,
        );
    }

    fn on_swap(&mut self, e: &SwapEvent) {
        let _ = writeln!(
            self.writer,
            "[swap] {:?} frame={} target={} buffer={}",
            e.layer, e.frame, e.target_frame, e.buffer,
        );
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        let _ = writeln!(
            self.writer,
            "[cache] {:?} key={:#x} bytes={} resident={}",
            e.action, e.key, e.bytes, e.resident_bytes,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {}ms",
            e.frame,
            e.phase.name(),
            e.timestamp.millis(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {}ms",
            e.frame,
            e.phase.name(),
            e.timestamp.millis(),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} begin={}ms draw={}ms end={}ms present={}ms committed={}",
            s.frame, s.begin_ms, s.draw_ms, s.end_ms, s.present_ms, s.committed,
        );
    }
}

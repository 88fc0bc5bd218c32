// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tagged little-endian records. [`decode`] reads them back as
//! an iterator of [`RecordedEvent`]. Addresses and byte counts are widened to
//! `u64` so recordings made on a 32-bit board decode on a 64-bit host.

use overlay_core::layer::LayerId;
use overlay_core::time::Timestamp;
use overlay_core::trace::{
    CacheAction, CacheEvent, CommitEvent, FrameSummary, LayerAllocatedEvent, LayerKindTag,
    LayerReleasedEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, ReindexEvent, SwapEvent,
    TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LAYER_ALLOCATED: u8 = 1;
const TAG_LAYER_RELEASED: u8 = 2;
const TAG_REINDEX: u8 = 3;
const TAG_COMMIT: u8 = 4;
const TAG_SWAP: u8 = 5;
const TAG_CACHE: u8 = 6;
const TAG_PHASE_BEGIN: u8 = 7;
const TAG_PHASE_END: u8 = 8;
const TAG_FRAME_SUMMARY: u8 = 9;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_usize(&mut self, v: usize) {
        self.write_u64(v as u64);
    }

    fn write_layer(&mut self, layer: LayerId) {
        self.write_u32(layer.index());
        self.write_u32(layer.generation());
    }

    fn write_option_index(&mut self, v: Option<u8>) {
        match v {
            Some(index) => {
                self.write_u8(1);
                self.write_u8(index);
            }
            None => {
                self.write_u8(0);
                self.write_u8(0);
            }
        }
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::BeginFrame => 0,
            PhaseKind::Draw => 1,
            PhaseKind::EndFrame => 2,
            PhaseKind::Present => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_layer_allocated(&mut self, e: &LayerAllocatedEvent) {
        self.write_u8(TAG_LAYER_ALLOCATED);
        self.write_layer(e.layer);
        self.write_u8(match e.kind {
            LayerKindTag::Image => 0,
            LayerKindTag::Item => 1,
        });
        self.write_option_index(e.index);
        self.write_u16(e.z);
    }

    fn on_layer_released(&mut self, e: &LayerReleasedEvent) {
        self.write_u8(TAG_LAYER_RELEASED);
        self.write_layer(e.layer);
        self.write_option_index(e.index);
    }

    fn on_reindex(&mut self, e: &ReindexEvent) {
        self.write_u8(TAG_REINDEX);
        self.write_layer(e.layer);
        self.write_option_index(e.from);
        self.write_u8(e.to);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.write_u8(TAG_COMMIT);
        self.write_u32(e.frame);
        self.write_u32(e.committed);
    }

    fn on_swap(&mut self, e: &SwapEvent) {
        self.write_u8(TAG_SWAP);
        self.write_layer(e.layer);
        self.write_u32(e.frame);
        self.write_u32(e.target_frame);
        self.write_u8(e.buffer);
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        self.write_u8(TAG_CACHE);
        self.write_u8(match e.action {
            CacheAction::Added => 0,
            CacheAction::Hit => 1,
            CacheAction::Evicted => 2,
            CacheAction::Rejected => 3,
            CacheAction::Removed => 4,
        });
        self.write_usize(e.key);
        self.write_usize(e.bytes);
        self.write_usize(e.resident_bytes);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u32(e.frame);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.millis());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u32(e.frame);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.millis());
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u32(s.frame);
        self.write_u64(s.begin_ms);
        self.write_u64(s.draw_ms);
        self.write_u64(s.end_ms);
        self.write_u64(s.present_ms);
        self.write_u32(s.committed);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A cache event as recorded, with host-width addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedCacheEvent {
    /// What happened.
    pub action: CacheAction,
    /// Source texture address.
    pub key: u64,
    /// Size of the entry in bytes.
    pub bytes: u64,
    /// Total resident bytes after the action.
    pub resident_bytes: u64,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`LayerAllocatedEvent`].
    LayerAllocated(LayerAllocatedEvent),
    /// A [`LayerReleasedEvent`].
    LayerReleased(LayerReleasedEvent),
    /// A [`ReindexEvent`].
    Reindex(ReindexEvent),
    /// A [`CommitEvent`].
    Commit(CommitEvent),
    /// A [`SwapEvent`].
    Swap(SwapEvent),
    /// A [`CacheEvent`].
    Cache(RecordedCacheEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_layer(&mut self) -> Option<LayerId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(LayerId::from_raw(index, generation))
    }

    fn read_option_index(&mut self) -> Option<Option<u8>> {
        let present = self.read_u8()?;
        let index = self.read_u8()?;
        Some((present != 0).then_some(index))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::BeginFrame,
            1 => PhaseKind::Draw,
            2 => PhaseKind::EndFrame,
            _ => PhaseKind::Present,
        })
    }

    fn decode_layer_allocated(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LayerAllocated(LayerAllocatedEvent {
            layer: self.read_layer()?,
            kind: match self.read_u8()? {
                0 => LayerKindTag::Image,
                _ => LayerKindTag::Item,
            },
            index: self.read_option_index()?,
            z: self.read_u16()?,
        }))
    }

    fn decode_layer_released(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LayerReleased(LayerReleasedEvent {
            layer: self.read_layer()?,
            index: self.read_option_index()?,
        }))
    }

    fn decode_reindex(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reindex(ReindexEvent {
            layer: self.read_layer()?,
            from: self.read_option_index()?,
            to: self.read_u8()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitEvent {
            frame: self.read_u32()?,
            committed: self.read_u32()?,
        }))
    }

    fn decode_swap(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Swap(SwapEvent {
            layer: self.read_layer()?,
            frame: self.read_u32()?,
            target_frame: self.read_u32()?,
            buffer: self.read_u8()?,
        }))
    }

    fn decode_cache(&mut self) -> Option<RecordedEvent> {
        let action = match self.read_u8()? {
            0 => CacheAction::Added,
            1 => CacheAction::Hit,
            2 => CacheAction::Evicted,
            3 => CacheAction::Rejected,
            _ => CacheAction::Removed,
        };
        Some(RecordedEvent::Cache(RecordedCacheEvent {
            action,
            key: self.read_u64()?,
            bytes: self.read_u64()?,
            resident_bytes: self.read_u64()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame: self.read_u32()?,
            phase: self.read_phase()?,
            timestamp: Timestamp(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame: self.read_u32()?,
            phase: self.read_phase()?,
            timestamp: Timestamp(self.read_u64()?),
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame: self.read_u32()?,
            begin_ms: self.read_u64()?,
            draw_ms: self.read_u64()?,
            end_ms: self.read_u64()?,
            present_ms: self.read_u64()?,
            committed: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_LAYER_ALLOCATED => self.decode_layer_allocated(),
            TAG_LAYER_RELEASED => self.decode_layer_released(),
            TAG_REINDEX => self.decode_reindex(),
            TAG_COMMIT => self.decode_commit(),
            TAG_SWAP => self.decode_swap(),
            TAG_CACHE => self.decode_cache(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

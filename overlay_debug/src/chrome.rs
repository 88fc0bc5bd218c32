// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Phases become duration events on the frame track. Layer, commit, and
//! swap events have no timestamp of their own, so they are placed at the
//! most recent phase boundary seen before them. Rotation cache residency is
//! exported as a counter track.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

const FRAME_TRACK: u32 = 0;
const LAYER_TRACK: u32 = 1;
const CACHE_TRACK: u32 = 2;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Millisecond timestamps are converted to microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut clock_us = 0_u64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PhaseBegin(e) => {
                clock_us = millis_to_us(e.timestamp.millis());
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": clock_us,
                    "pid": 0,
                    "tid": FRAME_TRACK,
                    "args": { "frame": e.frame }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                clock_us = millis_to_us(e.timestamp.millis());
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": clock_us,
                    "pid": 0,
                    "tid": FRAME_TRACK,
                    "args": { "frame": e.frame }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": clock_us,
                    "pid": 0,
                    "tid": FRAME_TRACK,
                    "s": "t",
                    "args": {
                        "frame": s.frame,
                        "begin_ms": s.begin_ms,
                        "draw_ms": s.draw_ms,
                        "end_ms": s.end_ms,
                        "present_ms": s.present_ms,
                        "committed": s.committed,
                    }
                }));
            }
            RecordedEvent::Commit(e) => {
                events.push(instant(
                    "Commit",
                    clock_us,
                    FRAME_TRACK,
                    json!({ "frame": e.frame, "committed": e.committed }),
                ));
            }
            RecordedEvent::Swap(e) => {
                events.push(instant(
                    "Swap",
                    clock_us,
                    LAYER_TRACK,
                    json!({
                        "layer": format!("{:?}", e.layer),
                        "frame": e.frame,
                        "target_frame": e.target_frame,
                        "buffer": e.buffer,
                    }),
                ));
            }
            RecordedEvent::LayerAllocated(e) => {
                events.push(instant(
                    "LayerAllocated",
                    clock_us,
                    LAYER_TRACK,
                    json!({
                        "layer": format!("{:?}", e.layer),
                        "kind": format!("{:?}", e.kind),
                        "index": e.index,
                        "z": e.z,
                    }),
                ));
            }
            RecordedEvent::LayerReleased(e) => {
                events.push(instant(
                    "LayerReleased",
                    clock_us,
                    LAYER_TRACK,
                    json!({ "layer": format!("{:?}", e.layer), "index": e.index }),
                ));
            }
            RecordedEvent::Reindex(e) => {
                events.push(instant(
                    "Reindex",
                    clock_us,
                    LAYER_TRACK,
                    json!({
                        "layer": format!("{:?}", e.layer),
                        "from": e.from,
                        "to": e.to,
                    }),
                ));
            }
            RecordedEvent::Cache(e) => {
                events.push(instant(
                    &format!("Cache{:?}", e.action),
                    clock_us,
                    CACHE_TRACK,
                    json!({ "key": format!("{:#x}", e.key), "bytes": e.bytes }),
                ));
                events.push(json!({
                    "ph": "C",
                    "name": "RotationCache",
                    "ts": clock_us,
                    "pid": 0,
                    "tid": CACHE_TRACK,
                    "args": { "resident_bytes": e.resident_bytes }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, ts: u64, tid: u32, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "ts": ts,
        "pid": 0,
        "tid": tid,
        "s": "t",
        "args": args,
    })
}

fn millis_to_us(ms: u64) -> u64 {
    ms.saturating_mul(1000)
}

// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for a hardware-plane display compositor.
//!
//! `overlay_core` maps a small set of application layers onto the fixed
//! planes of a display controller, keeping plane order consistent with layer
//! z, and swaps double-buffered layers in step with vertical blanking. It is
//! `no_std` compatible (with `alloc`) and reaches hardware only through
//! traits.
//!
//! # Architecture
//!
//! ```text
//!   Application
//!       │ allocate / update / deallocate
//!       ▼
//!   DisplayCompositor ──► LayerRegistry ──► DisplayController (registers)
//!       │                                          ▲
//!       │ begin_frame / end_frame                  │ commit()
//!       ▼                                          │ shadow load
//!   Vsync counter ◄── VsyncIrq::on_interrupt ◄── vblank interrupt
//!       │
//!       ▼
//!   Suspension (main-loop and vsync semaphores)
//! ```
//!
//! **[`layer`]**: Layers, sprites, and the registry that allocates plane
//! indices. Property changes are written to shadow registers immediately and
//! become visible together on [`commit`](compositor::DisplayCompositor::commit).
//!
//! **[`compositor`]**: The layer engine. Allocates item-layer buffers and
//! runs the per-layer frame state machine against the vsync counter.
//!
//! **[`vsync`]**: Frame counter advanced from interrupt context, with the
//! wraparound-safe wait used to gate buffer swaps.
//!
//! **[`signal`]**: Binary semaphores that suspend the main loop until an
//! interrupt or another task resumes it.
//!
//! **[`backend`]**: The [`DisplayController`](backend::DisplayController)
//! trait that board support implements.
//!
//! **[`memory`]**: Aligned allocators for frame buffers and preload memory.
//!
//! **[`format`]** and **[`surface`]**: Pixel formats and buffer descriptors.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Records layer and commit events for
//!   delivery to a [`TraceSink`](trace::TraceSink).
//! - `trace-rich` (disabled by default, implies `trace`): Also records every
//!   plane reassignment.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod compositor;
pub mod config;
pub mod error;
pub mod format;
pub mod geometry;
pub mod layer;
pub mod memory;
pub mod output;
pub mod signal;
pub mod surface;
pub mod time;
pub mod trace;
pub mod vsync;

#[cfg(test)]
mod testing;

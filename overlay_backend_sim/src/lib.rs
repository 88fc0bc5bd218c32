// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host simulation backend for the overlay platform.
//!
//! Runs the whole compositor stack on a desktop OS. Each hardware seam has
//! a simulated counterpart:
//!
//! - [`semaphore::CondvarSemaphore`]: a binary semaphore over a mutex and
//!   condition variable, signalable from any thread.
//! - [`vblank::VblankTicker`]: a thread that calls the vsync interrupt
//!   handler at a fixed refresh period.
//! - [`display::SimDisplay`]: overlay-plane registers with shadow/latched
//!   register sets.
//! - [`gpu::SimGpu`]: a GPU that records submitted work and tracks
//!   queued-but-unfinished commands.
//! - [`gpu::SimRenderer`]: records CPU fallback blends.
//! - [`board::SimBoard`]: the [`Board`](overlay_platform::board::Board)
//!   tying them together, with a simulated memory map.

pub mod board;
pub mod display;
pub mod gpu;
pub mod semaphore;
pub mod vblank;

pub use board::{MemoryMap, SimBoard};

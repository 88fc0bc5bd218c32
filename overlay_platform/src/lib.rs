// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The platform context for an overlay display board.
//!
//! `overlay_platform` is the composition root the GUI engine talks to. A
//! board implements [`Board`](board::Board) to name its hardware seams and
//! hands the concrete parts to [`PlatformContext`](context::PlatformContext),
//! which owns the layer compositor and the GPU drawing engine and drives the
//! main loop.
//!
//! ```text
//!             GUI engine
//!                 │ update / begin_frame / end_frame / present_frame
//!                 ▼
//!         ┌──────────────────┐
//!         │ PlatformContext  │──── main loop semaphore, scheduler
//!         └──┬────────────┬──┘
//!            │            │
//!            ▼            ▼
//!   DisplayCompositor  DrawingEngine ─── rotation cache
//!            │            │
//!            ▼            ▼
//!   display controller   GPU
//! ```
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Records frame phases and forwards
//!   compositor and cache events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod board;
pub mod context;

#[cfg(test)]
mod testing;

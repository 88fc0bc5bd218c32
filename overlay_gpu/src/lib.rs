// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU drawing for overlay item layers.
//!
//! `overlay_gpu` turns abstract draw calls (rectangles, images, alpha maps,
//! vector paths) into calls on a VGLite-style 2D GPU, falling back to a
//! software renderer for formats the GPU cannot sample.
//!
//! **[`device`]**: The [`GpuDevice`](device::GpuDevice) trait a board
//! implements over its GPU driver.
//!
//! **[`engine`]**: [`DrawingEngine`](engine::DrawingEngine), which owns the
//! device, the bound target buffer, the texture descriptor ring, and the
//! gradient cleanup queue, and chooses between GPU and CPU per call.
//!
//! **[`path`]**: Path segments and their encoding into the GPU's op-code
//! streams, with fill and stroke streams built lazily.
//!
//! **[`rotation_cache`]**: Bounded cache of tiled copies of rotated
//! textures, evicting the least recently used entry under memory pressure.
//!
//! **[`transform`]**: 3×3 transforms and their classification.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Records rotation cache events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod config;
pub mod device;
pub mod engine;
pub mod path;
pub mod rotation_cache;
pub mod transform;

#[cfg(test)]
mod testing;

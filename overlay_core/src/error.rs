// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy and the fatal halt primitive.
//!
//! Two kinds of failure exist at this layer:
//!
//! - **Fatal** conditions ([`ErrorCode`]) are configuration bugs: hardware
//!   layer slots and cache memory are fixed at build time, and a pixel format
//!   the display path cannot scan out leaves no sensible fallback. They go
//!   through [`fatal`], which emits one diagnostic log line and halts.
//! - **Recoverable** conditions ([`AllocateError`]) are returned to the
//!   caller, who decides whether to retry or drop the request.

use crate::geometry::Size;

/// Identifies a fatal condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorCode {
    /// More layers than the display controller has hardware slots.
    #[error("layer count exceeded")]
    LayerCountExceeded,
    /// A pixel format reached a hardware path that cannot handle it.
    #[error("unsupported pixel format")]
    UnsupportedPixelFormat,
    /// Pixel memory for a layer could not be allocated.
    #[error("layer allocation failed")]
    LayerAllocationFailed,
    /// The rotation cache is empty and still cannot satisfy an allocation.
    #[error("rotation cache exhausted")]
    CacheExhausted,
    /// The GPU context could not be brought up.
    #[error("gpu initialization failed")]
    GpuInitializationFailed,
    /// A draw call arrived before a target buffer was bound.
    #[error("drawing buffer not set")]
    DrawingBufferNotSet,
    /// A general-purpose allocator ran out of memory.
    #[error("memory allocation failed")]
    MemoryAllocationFailed,
}

/// Logs `code` with its context value and halts.
///
/// Every fatal condition in the workspace funnels through here so that a
/// device in the field always emits the same diagnostic shape before it stops.
/// On the host, the halt is a panic whose message contains the code's
/// description, which tests match with `#[should_panic(expected = ...)]`.
#[cold]
#[track_caller]
pub fn fatal(code: ErrorCode, context: i64) -> ! {
    log::error!("fatal error: {code} (context {context})");
    panic!("fatal error: {code} (context {context})");
}

/// A recoverable failure from a layer allocation or update request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocateError {
    /// The registry already holds the maximum number of layers.
    #[error("layer registry is full ({capacity} layers)")]
    Full {
        /// Configured layer capacity.
        capacity: usize,
    },
    /// The requested layer does not fit on its screen.
    #[error("layer size {requested} exceeds screen size {screen}")]
    TooLarge {
        /// Requested layer size.
        requested: Size,
        /// Size of the target screen.
        screen: Size,
    },
    /// The handle refers to a layer or sprite that no longer exists.
    #[error("stale handle")]
    StaleHandle,
}

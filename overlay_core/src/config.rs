// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor configuration.
//!
//! [`CompositorConfig`] captures the build-time constants of a display
//! controller: how many overlay planes it has, whether it supports a
//! per-plane global alpha, and how pixel memory must be aligned. Use a preset
//! such as [`CompositorConfig::rt1170()`] and override individual fields with
//! struct update syntax when a board differs.

/// What happens when an allocation would exceed the layer capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverflowPolicy {
    /// Halt through [`fatal`](crate::error::fatal) with
    /// [`ErrorCode::LayerCountExceeded`](crate::error::ErrorCode::LayerCountExceeded).
    Fatal,
    /// Return [`AllocateError::Full`](crate::error::AllocateError::Full) and
    /// leave the registry untouched.
    Reject,
}

/// Configuration for a [`DisplayCompositor`](crate::compositor::DisplayCompositor).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Number of hardware overlay planes.
    pub max_layer_count: usize,
    /// Whether the controller applies a per-plane global alpha.
    ///
    /// When enabled, sprite opacity multiplies into child opacity and each
    /// plane's blend configuration overrides the embedded alpha with
    /// `255 * opacity`. When disabled, planes use their embedded alpha and
    /// the layer's own opacity is reported unchanged.
    pub global_alpha: bool,
    /// Byte alignment of item-layer frame buffers.
    pub framebuffer_alignment: usize,
    /// Behaviour when the layer capacity is exceeded.
    pub overflow: OverflowPolicy,
    /// Scheduler tick period in milliseconds.
    pub tick_period_ms: u32,
}

impl CompositorConfig {
    /// LCDIF v2 on i.MX RT1170: eight planes with global alpha.
    #[must_use]
    pub const fn rt1170() -> Self {
        Self {
            max_layer_count: 8,
            global_alpha: true,
            framebuffer_alignment: 32,
            overflow: OverflowPolicy::Fatal,
            tick_period_ms: 1,
        }
    }

    /// Host simulation: same limits as the target, but capacity overflow is
    /// reported instead of halting.
    #[must_use]
    pub const fn host() -> Self {
        Self {
            overflow: OverflowPolicy::Reject,
            ..Self::rt1170()
        }
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self::rt1170()
    }
}

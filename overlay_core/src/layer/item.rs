// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-buffered item layers and their swap state.
//!
//! An item layer owns two buffers. `buffer_id` names the *back* buffer, the
//! one the next frame is drawn into; the other is the front buffer, last
//! handed to the display controller. A frame moves through
//! [`FrameState::Idle`] → [`FrameState::Drawing`] →
//! [`FrameState::PendingPresent`] and back to `Idle` with the buffers
//! flipped. The blocking parts of that cycle live on
//! [`DisplayCompositor`](crate::compositor::DisplayCompositor); this module
//! only holds the state and the frame arithmetic.

use crate::memory::Allocation;
use crate::surface::SurfaceDescriptor;

/// Refresh interval meaning "present on the next vertical blank".
pub const ASAP: i32 = -1;

/// Where an item layer is in its frame cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// No frame in progress.
    Idle,
    /// `begin_frame` returned the back buffer; drawing is under way.
    Drawing,
    /// `end_frame` is waiting for the target frame.
    PendingPresent,
}

/// One of the two pixel buffers of an item layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemLayerBuffer {
    /// Memory backing the buffer.
    pub allocation: Allocation,
    /// Surface view of the same memory.
    pub surface: SurfaceDescriptor,
}

/// Kind-specific state of an item layer.
#[derive(Clone, Debug)]
pub struct ItemLayer {
    pub(crate) buffers: [ItemLayerBuffer; 2],
    pub(crate) buffer_id: usize,
    pub(crate) target_frame: u32,
    pub(crate) state: FrameState,
}

impl ItemLayer {
    pub(crate) fn new(buffers: [ItemLayerBuffer; 2]) -> Self {
        Self {
            buffers,
            buffer_id: 0,
            target_frame: 0,
            state: FrameState::Idle,
        }
    }

    /// Returns the buffer the next frame draws into.
    #[must_use]
    pub fn back_buffer(&self) -> &ItemLayerBuffer {
        &self.buffers[self.buffer_id]
    }

    /// Returns the buffer most recently presented.
    #[must_use]
    pub fn front_buffer(&self) -> &ItemLayerBuffer {
        &self.buffers[self.buffer_id ^ 1]
    }

    /// Returns the index of the back buffer (0 or 1).
    #[must_use]
    pub fn buffer_id(&self) -> usize {
        self.buffer_id
    }

    /// Returns the frame the current frame is scheduled for.
    #[must_use]
    pub fn target_frame(&self) -> u32 {
        self.target_frame
    }

    /// Returns the frame-cycle state.
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Returns both buffers.
    #[must_use]
    pub fn buffers(&self) -> &[ItemLayerBuffer; 2] {
        &self.buffers
    }

    /// Computes the frame a new frame should be shown on.
    ///
    /// [`ASAP`] targets the next vertical blank; any other interval counts
    /// from the frame of the layer's last commit.
    #[must_use]
    pub fn target_for(refresh_interval: i32, current_frame: u32, swap_frame: u32) -> u32 {
        if refresh_interval == ASAP {
            current_frame.wrapping_add(1)
        } else {
            swap_frame.wrapping_add_signed(refresh_interval)
        }
    }

    pub(crate) fn flip(&mut self) {
        self.buffer_id ^= 1;
        self.state = FrameState::Idle;
    }
}

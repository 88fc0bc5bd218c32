// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertical-blank frame counter and the ISR entry point.
//!
//! [`Vsync`] holds the two pieces of state shared with the vblank interrupt:
//! a monotonically increasing frame counter and a "waiting for vsync" flag
//! armed by every commit. The interrupt is the only writer of the counter;
//! tasks only read it. Both are lock-free atomics, so the increment in
//! [`VsyncIrq::on_interrupt`] needs no critical section, and the semaphore
//! signal that follows it is only a wake-up hint. Waiters always re-check the
//! counter after waking.
//!
//! Frame numbers are `u32` and wrap. Distances between a target frame and
//! the current frame are computed with wrapping subtraction and treated as
//! "still ahead" only while smaller than [`WRAP_WINDOW`]; anything larger is
//! a target that has already passed.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::signal::{Semaphore, SemaphoreKind, Suspension};
use crate::time::Timeout;

/// Targets further ahead than this many frames are treated as elapsed.
pub const WRAP_WINDOW: u32 = 0x100;

/// Frame counter and waiting flag shared with the vblank interrupt.
#[derive(Debug, Default)]
pub struct Vsync {
    frame: AtomicU32,
    waiting: AtomicBool,
}

impl Vsync {
    /// Creates a counter at frame zero with no commit pending.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame: AtomicU32::new(0),
            waiting: AtomicBool::new(false),
        }
    }

    /// Returns the number of vertical blanks seen so far (wrapping).
    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> u32 {
        self.frame.load(Ordering::Acquire)
    }

    /// Returns whether a commit is waiting for the next vertical blank.
    #[inline]
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    /// Marks a commit as pending until the next vertical blank.
    #[inline]
    pub fn arm(&self) {
        self.waiting.store(true, Ordering::Release);
    }

    /// Records one vertical blank and returns the new frame number.
    ///
    /// Interrupt-side half of the handshake; [`VsyncIrq`] pairs it with the
    /// semaphore signal.
    #[inline]
    pub fn tick(&self) -> u32 {
        let frame = self.frame.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        self.waiting.store(false, Ordering::Release);
        frame
    }

    /// Returns how many frames remain until `target`, or `None` if `target`
    /// has been reached or lies in the past.
    #[must_use]
    pub fn frames_until(&self, target: u32) -> Option<u32> {
        let delta = target.wrapping_sub(self.current_frame());
        (delta != 0 && delta < WRAP_WINDOW).then_some(delta)
    }

    /// Blocks until the pending commit (if any) has been latched.
    pub fn wait_for_vsync<S: Semaphore>(&self, suspension: &Suspension<S>) {
        while self.is_waiting() {
            suspension.suspend(SemaphoreKind::Vsync, Timeout::Forever);
        }
    }

    /// Blocks until the counter reaches `target`.
    ///
    /// Returns immediately if `target` has already passed.
    pub fn wait_for_frame<S: Semaphore>(&self, target: u32, suspension: &Suspension<S>) {
        while self.frames_until(target).is_some() {
            suspension.suspend(SemaphoreKind::Vsync, Timeout::Forever);
        }
    }
}

/// The vblank interrupt handler.
///
/// Holds shared handles to the counter and the semaphore pair, so it can be
/// moved into whatever static the board's vector table dispatches through.
#[derive(Debug)]
pub struct VsyncIrq<S> {
    vsync: Arc<Vsync>,
    suspension: Arc<Suspension<S>>,
}

impl<S> Clone for VsyncIrq<S> {
    fn clone(&self) -> Self {
        Self {
            vsync: Arc::clone(&self.vsync),
            suspension: Arc::clone(&self.suspension),
        }
    }
}

impl<S: Semaphore> VsyncIrq<S> {
    /// Creates a handler over shared state.
    pub fn new(vsync: Arc<Vsync>, suspension: Arc<Suspension<S>>) -> Self {
        Self { vsync, suspension }
    }

    /// Services one vertical-blank interrupt.
    ///
    /// Advances the frame counter, clears the waiting flag, and resumes the
    /// vsync semaphore. The resume is unconditional: a waiter re-checks the
    /// counter and goes back to sleep if its target is still ahead.
    pub fn on_interrupt(&self) {
        self.vsync.tick();
        self.suspension.resume(SemaphoreKind::Vsync);
    }
}

// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Suspend/resume semaphore pair.
//!
//! The render task sleeps in exactly two places: the main loop waits for the
//! next scheduled engine update, and frame presentation waits for vertical
//! blank. Each has its own binary semaphore, bundled in [`Suspension`].
//!
//! [`Semaphore`] is the seam to the RTOS. Implementations must make
//! [`signal`](Semaphore::signal) callable from interrupt context (on FreeRTOS
//! this means dispatching to the `FromISR` variant when inside a handler).

use alloc::sync::Arc;

use crate::time::{Timebase, Timeout, WaitTicks};

/// A binary semaphore shared between task and interrupt context.
pub trait Semaphore {
    /// Blocks until signalled or until `ticks` elapse.
    ///
    /// Returns `true` if the semaphore was taken, `false` on timeout.
    fn wait(&self, ticks: WaitTicks) -> bool;

    /// Releases the semaphore. Safe to call from an interrupt handler.
    fn signal(&self);
}

impl<S: Semaphore + ?Sized> Semaphore for Arc<S> {
    fn wait(&self, ticks: WaitTicks) -> bool {
        (**self).wait(ticks)
    }

    fn signal(&self) {
        (**self).signal();
    }
}

/// Selects one of the two semaphores in a [`Suspension`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SemaphoreKind {
    /// Wakes the main loop for an engine update.
    MainLoop,
    /// Wakes frame presentation after vertical blank.
    Vsync,
}

/// The main-loop and vsync semaphores plus the tick conversion they share.
#[derive(Debug)]
pub struct Suspension<S> {
    main_loop: S,
    vsync: S,
    timebase: Timebase,
}

impl<S: Semaphore> Suspension<S> {
    /// Creates the pair.
    pub fn new(main_loop: S, vsync: S, timebase: Timebase) -> Self {
        Self {
            main_loop,
            vsync,
            timebase,
        }
    }

    /// Blocks on the selected semaphore for at most `timeout`.
    ///
    /// Returns `true` if resumed, `false` on timeout.
    pub fn suspend(&self, kind: SemaphoreKind, timeout: Timeout) -> bool {
        self.semaphore(kind).wait(self.timebase.wait_ticks(timeout))
    }

    /// Resumes a task suspended on the selected semaphore.
    ///
    /// Callable from interrupt context.
    pub fn resume(&self, kind: SemaphoreKind) {
        self.semaphore(kind).signal();
    }

    /// Returns the selected semaphore.
    #[must_use]
    pub fn semaphore(&self, kind: SemaphoreKind) -> &S {
        match kind {
            SemaphoreKind::MainLoop => &self.main_loop,
            SemaphoreKind::Vsync => &self.vsync,
        }
    }

    /// Returns the tick conversion used for timeouts.
    #[must_use]
    pub fn timebase(&self) -> Timebase {
        self.timebase
    }
}

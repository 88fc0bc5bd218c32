// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary semaphore over `std::sync`.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use overlay_core::signal::Semaphore;
use overlay_core::time::WaitTicks;

/// A binary semaphore backed by a mutex and a condition variable.
///
/// Signals do not accumulate: signalling an already signalled semaphore is
/// a no-op, as with an RTOS binary semaphore.
#[derive(Debug)]
pub struct CondvarSemaphore {
    signalled: Mutex<bool>,
    cv: Condvar,
    tick: Duration,
}

impl Default for CondvarSemaphore {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl CondvarSemaphore {
    /// Creates an unsignalled semaphore whose scheduler tick lasts `tick`.
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            signalled: Mutex::new(false),
            cv: Condvar::new(),
            tick,
        }
    }

    /// Returns whether a signal is pending.
    #[must_use]
    pub fn is_signalled(&self) -> bool {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Semaphore for CondvarSemaphore {
    fn wait(&self, ticks: WaitTicks) -> bool {
        let guard = self.lock();
        let mut signalled = match ticks {
            WaitTicks::Forever => self
                .cv
                .wait_while(guard, |s| !*s)
                .unwrap_or_else(PoisonError::into_inner),
            WaitTicks::Ticks(n) => {
                let (guard, _) = self
                    .cv
                    .wait_timeout_while(guard, self.tick * n, |s| !*s)
                    .unwrap_or_else(PoisonError::into_inner);
                guard
            }
        };
        let taken = *signalled;
        *signalled = false;
        taken
    }

    fn signal(&self) {
        *self.lock() = true;
        self.cv.notify_one();
    }
}

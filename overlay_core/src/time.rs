// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Millisecond timestamps and scheduler tick conversion.
//!
//! [`Timestamp`] is milliseconds since boot, the unit the GUI engine uses for
//! its update schedule.
//!
//! [`Timeout`] is what callers pass to a blocking wait. [`Timebase`] converts
//! it to [`WaitTicks`], the unit the RTOS scheduler understands. A timeout at
//! or beyond the saturation threshold maps to [`WaitTicks::Forever`] rather
//! than wrapping into a short wait.

use core::fmt;

/// Milliseconds since boot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Returns the milliseconds from `earlier` to `self`, or zero if
    /// `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns `self + millis`, saturating at the maximum timestamp.
    #[inline]
    #[must_use]
    pub const fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

/// How long a blocking wait may last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until signalled.
    Forever,
    /// Wait at most this many milliseconds.
    Millis(u64),
}

impl Timeout {
    /// Millisecond values at or above this threshold mean "no timeout".
    pub const SATURATION_MILLIS: u64 = u32::MAX as u64;

    /// Creates a timeout from a millisecond count, mapping near-saturating
    /// values to [`Timeout::Forever`].
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        if millis >= Self::SATURATION_MILLIS {
            Self::Forever
        } else {
            Self::Millis(millis)
        }
    }
}

/// A wait duration in scheduler ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitTicks {
    /// Block until signalled (the scheduler's maximum delay).
    Forever,
    /// Block at most this many ticks.
    Ticks(u32),
}

/// Conversion from milliseconds to scheduler ticks.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Milliseconds per scheduler tick. Zero is treated as one.
    pub tick_period_ms: u32,
}

impl Timebase {
    /// A 1 kHz scheduler tick.
    pub const MILLIS: Self = Self { tick_period_ms: 1 };

    /// Converts a timeout to scheduler ticks.
    ///
    /// Finite timeouts round down, matching the RTOS convention of
    /// `ms / tick_period`.
    #[must_use]
    pub const fn wait_ticks(self, timeout: Timeout) -> WaitTicks {
        match timeout {
            Timeout::Forever => WaitTicks::Forever,
            Timeout::Millis(ms) if ms >= Timeout::SATURATION_MILLIS => WaitTicks::Forever,
            Timeout::Millis(ms) => {
                let period = if self.tick_period_ms == 0 {
                    1
                } else {
                    self.tick_period_ms as u64
                };
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "quotient of a value below u32::MAX by a positive divisor"
                )]
                let ticks = (ms / period) as u32;
                WaitTicks::Ticks(ticks)
            }
        }
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}ms/tick)", self.tick_period_ms)
    }
}

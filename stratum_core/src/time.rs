// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time and frame pacing.
//!
//! [`HostTime`] is a point in time as platform-native monotonic ticks.
//! [`Timebase`] converts ticks to nanoseconds (`nanos = ticks * numer /
//! denom`). [`Duration`] is a tick count.
//!
//! [`FrameClock`] yields the time elapsed since the previous painting pass,
//! which effects use to advance animations.

use core::fmt;
use core::ops::Sub;

/// A point in time expressed as platform-native monotonic ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Source of the current [`HostTime`].
pub trait HostClock {
    /// Returns the current time.
    fn now(&self) -> HostTime;
}

impl<F: Fn() -> HostTime> HostClock for F {
    fn now(&self) -> HostTime {
        self()
    }
}

/// Rational conversion factor from ticks to nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// A timebase where ticks are already nanoseconds (1:1).
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Creates a new timebase.
    ///
    /// # Panics
    ///
    /// Panics if `numer` or `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(
            numer != 0 && denom != 0,
            "timebase terms must not be zero"
        );
        Self { numer, denom }
    }

    /// Converts a tick count to nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        (ticks as u128 * self.numer as u128 / self.denom as u128) as u64
    }

    /// Converts nanoseconds to a tick count.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        (nanos as u128 * self.denom as u128 / self.numer as u128) as u64
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// A duration in platform-native ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Creates a duration from nanoseconds.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64, timebase: Timebase) -> Self {
        Self(timebase.nanos_to_ticks(nanos))
    }

    /// Converts this duration to whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn as_millis(self, timebase: Timebase) -> u64 {
        timebase.ticks_to_nanos(self.0) / 1_000_000
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

/// Measures the time between painting passes.
///
/// When painting was idle (no frame was needed for a while) the next
/// interval would be huge and make animations jump, so the first frame after
/// [`idle`](Self::idle) reports one millisecond instead. A clock that went
/// backwards also reports one millisecond; zero would mean "no time passed"
/// and stall animations.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    timebase: Timebase,
    last: Option<HostTime>,
}

impl FrameClock {
    /// Creates an idle clock.
    #[must_use]
    pub const fn new(timebase: Timebase) -> Self {
        Self {
            timebase,
            last: None,
        }
    }

    /// Returns the timebase used for the minimum interval.
    #[must_use]
    pub const fn timebase(&self) -> Timebase {
        self.timebase
    }

    /// Starts a painting pass at `now` and returns the time since the
    /// previous one.
    pub fn advance(&mut self, now: HostTime) -> Duration {
        let minimum = Duration::from_nanos(1_000_000, self.timebase);
        let diff = match self.last {
            Some(last) if now > last => now - last,
            _ => minimum,
        };
        self.last = Some(now);
        diff
    }

    /// Records that painting was skipped.
    pub fn idle(&mut self) {
        self.last = None;
    }

    /// Returns `true` if no painting pass happened since the last
    /// [`idle`](Self::idle).
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.last.is_none()
    }
}

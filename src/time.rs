//! Time values used by clocklab.
//!
//! Two notions of time live here and are kept deliberately distinct:
//!
//! - [`ClockReading`] is what a simulated clock *says*: a signed count of
//!   time units since a fixed epoch. Clocks may disagree and may be read
//!   before the epoch, so it is signed.
//! - [`VirtualTime`] is the simulation kernel's logical tick. It advances
//!   only when the scheduler dispatches events, never from wall-clock
//!   observation.

use serde::{Deserialize, Serialize};

// ── ClockReading ──────────────────────────────────────────────────────

/// A single clock's instantaneous value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClockReading(i64);

impl ClockReading {
    /// The epoch.
    pub const EPOCH: ClockReading = ClockReading(0);

    #[inline]
    pub fn new(units: i64) -> Self {
        ClockReading(units)
    }

    /// Return the raw unit count.
    #[inline]
    pub fn units(self) -> i64 {
        self.0
    }

    /// Read a clock that ticks in lock-step with virtual time.
    ///
    /// Saturates at `i64::MAX` for ticks beyond the signed range.
    #[inline]
    pub fn from_virtual(t: VirtualTime) -> Self {
        ClockReading(i64::try_from(t.ticks()).unwrap_or(i64::MAX))
    }

    /// `self − other`, or `None` on overflow.
    #[inline]
    pub fn checked_diff(self, other: ClockReading) -> Option<i64> {
        self.0.checked_sub(other.0)
    }

    /// Shift the reading by a signed amount, or `None` on overflow.
    #[inline]
    pub fn checked_shift(self, delta: i64) -> Option<ClockReading> {
        self.0.checked_add(delta).map(ClockReading)
    }
}

impl From<i64> for ClockReading {
    fn from(units: i64) -> Self {
        ClockReading(units)
    }
}

impl std::fmt::Display for ClockReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── VirtualTime ───────────────────────────────────────────────────────

/// A logical tick in simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Create a new `VirtualTime` from a raw tick value.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Compute the absolute time that is `delay` ticks after `self`.
    /// Returns `None` on overflow.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<VirtualTime> {
        self.0.checked_add(delay).map(VirtualTime)
    }

    /// Returns the duration (in ticks) between two points in time.
    /// Returns `None` if `other` is after `self`.
    #[inline]
    pub fn duration_since(self, other: VirtualTime) -> Option<u64> {
        self.0.checked_sub(other.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

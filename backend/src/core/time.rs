//! Simulated time
//!
//! The simulation clock counts integer ticks from zero. Time only moves when
//! the execution driver pops an event; nothing here reads the wall clock.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute point in simulated time, in ticks
///
/// # Example
/// ```
/// use cosim_simulator_core_rs::SimTime;
///
/// let t = SimTime::new(10);
/// assert_eq!(t.checked_add(5), Some(SimTime::new(15)));
/// assert!(SimTime::ZERO < t);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// Start of every simulation
    pub const ZERO: SimTime = SimTime(0);

    /// Largest representable time
    ///
    /// Doubles as the "infinitely far" sentinel returned by `next()` when
    /// nothing is pending, and as the timestamp of destroy-phase handles.
    pub const MAX: SimTime = SimTime(u64::MAX);

    #[inline]
    pub const fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// Raw tick value
    #[inline]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// `self + delay`, or `None` on overflow
    ///
    /// # Example
    /// ```
    /// use cosim_simulator_core_rs::SimTime;
    ///
    /// assert_eq!(SimTime::MAX.checked_add(1), None);
    /// ```
    #[inline]
    pub fn checked_add(self, delay: u64) -> Option<SimTime> {
        self.0.checked_add(delay).map(SimTime)
    }

    /// Ticks from `earlier` to `self`, saturating at zero
    #[inline]
    pub fn saturating_since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// True for the `MAX` sentinel
    #[inline]
    pub fn is_max(self) -> bool {
        self == Self::MAX
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            write!(f, "T=+inf")
        } else {
            write!(f, "T={}", self.0)
        }
    }
}

impl From<u64> for SimTime {
    fn from(ticks: u64) -> Self {
        SimTime(ticks)
    }
}

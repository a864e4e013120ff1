// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Lamport clock for stamping atoms.
//!
//! The clock holds the *next* timestamp to hand out. Every atom created
//! locally takes the current value and bumps the clock, so the clock is
//! always strictly greater than every timestamp in the weave. Merging two
//! clocks takes the max, which keeps that property for the merged weave.
//!
//! Complexity:
//! - increment: O(1)
//! - integrate: O(1)
//! - compare: O(1)

use std::cmp::Ordering;
use std::convert::Infallible;

#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::id::Clock;
use crate::crdt::Crdt;

/// A Lamport clock, itself a trivial max-merged CRDT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LamportClock {
    time: Clock,
}

impl LamportClock {
    /// Create a new clock starting at 0.
    pub fn new() -> LamportClock {
        return LamportClock { time: 0 };
    }

    /// Create a clock with a specific starting time.
    pub fn with_time(time: Clock) -> LamportClock {
        return LamportClock { time };
    }

    /// Get the current time.
    #[inline]
    pub fn time(&self) -> Clock {
        return self.time;
    }

    /// Take the current time and bump the clock.
    /// Returns the pre-increment time.
    #[inline]
    pub fn increment(&mut self) -> Clock {
        let time = self.time;
        self.time += 1;
        return time;
    }
}

impl Crdt for LamportClock {
    type Error = Infallible;

    fn integrate(&mut self, other: LamportClock) -> Result<(), Infallible> {
        self.time = self.time.max(other.time);
        return Ok(());
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for LamportClock {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.time.cmp(&other.time);
    }
}

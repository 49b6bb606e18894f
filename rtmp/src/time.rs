//! RTMP timestamps are 32 bit unsigned integers representing milliseconds from
//! an unknown epoch.
//!
//! Streams can run long enough for the value to wrap, so ordering cannot be a
//! plain integer comparison.  Per the RTMP specification two times are
//! adjacent when they are within 2<sup>31</sup> - 1 milliseconds of each
//! other, and comparisons are defined over that window.  `RtmpTimestamp`
//! wraps a `u32` and implements the windowed comparisons and wrapping
//! arithmetic so calling code never has to think about it.
//!
//! ```
//! use sml_rtmp::time::RtmpTimestamp;
//!
//! let early = RtmpTimestamp::new(10_000);
//! let late = RtmpTimestamp::new(4_000_000_000);
//!
//! // 4,000,000,000 is more than half the u32 range away, so `early` is
//! // considered to have wrapped past `late`.
//! assert!(early > late);
//! assert_eq!(early + 10, 10_010);
//! ```

use std::cmp::Ordering;
use std::num::Wrapping;
use std::ops::{Add, Sub};

/// The representation of a RTMP timestamp
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct RtmpTimestamp {
    /// Milliseconds from an unknown epoch
    pub value: u32,
}

const ADJACENCY_WINDOW: u32 = 2147483647;

impl RtmpTimestamp {
    pub fn new(initial_value: u32) -> Self {
        RtmpTimestamp {
            value: initial_value,
        }
    }

    pub fn set(&mut self, new_value: u32) {
        self.value = new_value;
    }
}

impl Add for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: RtmpTimestamp) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) + Wrapping(other.value)).0)
    }
}

impl Add<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: u32) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) + Wrapping(other)).0)
    }
}

impl Sub for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: RtmpTimestamp) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) - Wrapping(other.value)).0)
    }
}

impl Sub<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: u32) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) - Wrapping(other)).0)
    }
}

impl Ord for RtmpTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value == other.value {
            return Ordering::Equal;
        }

        // Within the adjacency window the natural order holds, outside of it
        // the smaller value is assumed to have wrapped around and sorts last.
        let forward_distance = other.value.wrapping_sub(self.value);
        if forward_distance < ADJACENCY_WINDOW {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

impl PartialOrd for RtmpTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<u32> for RtmpTimestamp {
    fn eq(&self, other: &u32) -> bool {
        self.value == *other
    }
}

impl PartialOrd<u32> for RtmpTimestamp {
    fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
        self.partial_cmp(&RtmpTimestamp::new(*other))
    }
}

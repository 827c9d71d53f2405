//! Traffic signal rotation for signaled intersections.

use super::error::{SimError, SimResult};

/// Cyclic approach rotation. Exactly one approach slot is green at a time.
///
/// The signal only knows about slots; which road maps to which slot is
/// decided by the intersection that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficSignal {
    approaches: usize,
    green: usize,
}

impl TrafficSignal {
    /// Create a signal with slot 0 green. Only 3-way and 4-way signals exist.
    pub fn new(approaches: usize) -> SimResult<Self> {
        if !(3..=4).contains(&approaches) {
            return Err(SimError::InvalidSignal(approaches));
        }
        Ok(Self {
            approaches,
            green: 0,
        })
    }

    pub fn approach_count(&self) -> usize {
        self.approaches
    }

    pub fn green_index(&self) -> usize {
        self.green
    }

    pub fn is_green(&self, slot: usize) -> bool {
        slot == self.green
    }

    /// Per-slot view, `true` for the green slot
    pub fn lights(&self) -> Vec<bool> {
        (0..self.approaches).map(|slot| slot == self.green).collect()
    }

    /// Clear the current green and open the next slot
    pub fn advance(&mut self) {
        self.green = (self.green + 1) % self.approaches;
    }
}

/// Counts ticks and reports when signals are due to rotate.
#[derive(Debug, Clone)]
pub struct SignalClock {
    interval: u64,
    elapsed: u64,
}

impl SignalClock {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            elapsed: 0,
        }
    }

    /// Advance one tick. Returns true exactly once every `interval` ticks.
    pub fn tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.interval {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }
}

//! Least Frequently Used (LFU) replacement policy.
//!
//! Keeps one usage counter per (row, way). A hit increments the counter; a
//! fill resets it to zero, so a zero counter doubles as the "unused or just
//! filled" marker. Victim selection prefers the first zero-counter way —
//! an unused slot should always be consumed before live data is evicted —
//! and only degrades to strict least-frequently-used ordering once every way
//! in the row carries a nonzero count.

use super::ReplacementPolicy;
use crate::fault::Fault;

/// LFU policy state.
pub struct LfuPolicy {
    associativity: usize,
    set_count: usize,
    /// Per (row, way) usage counter; zero marks an unused or just-filled way.
    counts: Vec<Vec<u32>>,
}

impl LfuPolicy {
    /// Creates a new LFU policy sized to the given geometry, all counters
    /// zeroed.
    ///
    /// # Arguments
    ///
    /// * `associativity` - Number of ways per row.
    /// * `set_count` - Number of rows.
    pub fn new(associativity: usize, set_count: usize) -> Self {
        Self {
            associativity,
            set_count,
            counts: vec![vec![0; associativity]; set_count],
        }
    }
}

impl ReplacementPolicy for LfuPolicy {
    fn update_stats(&mut self, way: usize, row: usize, is_valid: bool) -> Result<(), Fault> {
        crate::sanity_check!(
            row < self.set_count,
            format!("LFU row index {row} outside {} rows", self.set_count)
        );
        crate::sanity_check!(
            way < self.associativity,
            format!("LFU way index {way} outside {} ways", self.associativity)
        );
        let count = &mut self.counts[row][way];
        if is_valid {
            *count = count.saturating_add(1);
        } else {
            *count = 0;
        }
        Ok(())
    }

    /// Scans the row left to right: the first zero-counter way wins;
    /// otherwise the smallest counter, ties broken by the lowest index.
    fn select_way_to_evict(&self, row: usize) -> Result<usize, Fault> {
        let row_counts = self.counts.get(row).ok_or_else(|| {
            crate::sanity_fault!(format!("LFU row index {row} outside {} rows", self.set_count))
        })?;
        crate::sanity_check!(
            !row_counts.is_empty(),
            "LFU asked to evict from a row with no ways"
        );
        let mut victim = 0;
        let mut lowest = row_counts[0];
        for (way, &count) in row_counts.iter().enumerate() {
            if count == 0 {
                // Only unused or just-filled ways carry a zero count.
                return Ok(way);
            }
            if count < lowest {
                lowest = count;
                victim = way;
            }
        }
        Ok(victim)
    }
}

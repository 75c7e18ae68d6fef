//! Random replacement policy.
//!
//! Evicts a pseudo-randomly chosen way. The generator is a xorshift64 owned
//! by the policy instance and seeded with a fixed constant at construction,
//! so eviction sequences are reproducible run-to-run given the same access
//! sequence and associativity, and two coexisting caches (e.g. separate
//! program and data caches) draw from independent sequences.

use std::cell::Cell;

use super::ReplacementPolicy;
use crate::fault::Fault;

/// Fixed construction seed; reproducibility is a per-cache property.
const SEED: u64 = 123_456_789;

/// Random policy state.
pub struct RandomPolicy {
    associativity: usize,
    set_count: usize,
    /// Generator state, advanced on every selection. Kept in a `Cell` so that
    /// victim selection stays a non-mutating query of the bookkeeping.
    state: Cell<u64>,
}

impl RandomPolicy {
    /// Creates a new Random policy sized to the given geometry.
    ///
    /// # Arguments
    ///
    /// * `associativity` - Number of ways per row.
    /// * `set_count` - Number of rows (only used for bounds validation).
    pub fn new(associativity: usize, set_count: usize) -> Self {
        Self {
            associativity,
            set_count,
            state: Cell::new(SEED),
        }
    }

    fn next_random(&self) -> u64 {
        let mut x = self.state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.set(x);
        x
    }
}

impl ReplacementPolicy for RandomPolicy {
    /// No bookkeeping: access patterns do not affect random selection. The
    /// indices are still validated so corrupted callers are caught here like
    /// everywhere else.
    fn update_stats(&mut self, way: usize, row: usize, _is_valid: bool) -> Result<(), Fault> {
        crate::sanity_check!(
            row < self.set_count,
            format!("Random row index {row} outside {} rows", self.set_count)
        );
        crate::sanity_check!(
            way < self.associativity,
            format!("Random way index {way} outside {} ways", self.associativity)
        );
        Ok(())
    }

    /// Draws the next generator value and maps it onto a way index; `row` is
    /// validated but does not influence the choice.
    fn select_way_to_evict(&self, row: usize) -> Result<usize, Fault> {
        crate::sanity_check!(
            row < self.set_count,
            format!("Random row index {row} outside {} rows", self.set_count)
        );
        crate::sanity_check!(
            self.associativity > 0,
            "Random asked to evict from a row with no ways"
        );
        Ok((self.next_random() as usize) % self.associativity)
    }
}

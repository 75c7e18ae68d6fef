//! Least Recently Used (LRU) replacement policy.
//!
//! Maintains, per row, an explicit recency order of all way indices: position
//! 0 is the least recently used way and position A−1 the most recently used.
//! An inverse way→position map makes relocation a single bounded shift rather
//! than a search.
//!
//! The order starts as the identity permutation `[0, 1, …, A−1]` and must
//! remain a permutation of `[0, A)` at all times; losing a way from the order
//! is an internal error reported as a Sanity fault.

use super::ReplacementPolicy;
use crate::fault::Fault;

/// LRU policy state.
pub struct LruPolicy {
    associativity: usize,
    set_count: usize,
    /// Per row: position → way, least recently used first.
    order: Vec<Vec<u32>>,
    /// Per row: way → position, inverse of `order`.
    position: Vec<Vec<u32>>,
}

impl LruPolicy {
    /// Creates a new LRU policy sized to the given geometry, with every row's
    /// recency order initialized to identity.
    ///
    /// # Arguments
    ///
    /// * `associativity` - Number of ways per row.
    /// * `set_count` - Number of rows.
    pub fn new(associativity: usize, set_count: usize) -> Self {
        let identity: Vec<u32> = (0..associativity as u32).collect();
        Self {
            associativity,
            set_count,
            order: vec![identity.clone(); set_count],
            position: vec![identity; set_count],
        }
    }

    fn check_bounds(&self, way: usize, row: usize) -> Result<(), Fault> {
        crate::sanity_check!(
            row < self.set_count,
            format!("LRU row index {row} outside {} rows", self.set_count)
        );
        crate::sanity_check!(
            way < self.associativity,
            format!("LRU way index {way} outside {} ways", self.associativity)
        );
        Ok(())
    }

    /// Relocates `way` to the most-recent end of its row's order, shifting
    /// the entries between its old slot and the end one position toward the
    /// front. Bounds must already have been checked.
    fn promote(&mut self, way: usize, row: usize) -> Result<(), Fault> {
        let order = &mut self.order[row];
        let position = &mut self.position[row];
        let pos = position[way] as usize;
        crate::sanity_check!(
            pos < order.len() && order[pos] as usize == way,
            "LRU lost a way from its recency order"
        );
        for p in pos..self.associativity - 1 {
            let moved = order[p + 1];
            order[p] = moved;
            position[moved as usize] = p as u32;
        }
        order[self.associativity - 1] = way as u32;
        position[way] = (self.associativity - 1) as u32;
        Ok(())
    }
}

impl ReplacementPolicy for LruPolicy {
    /// Records a touch of `way` in `row`.
    ///
    /// A hit and a fresh fill both leave the way the most recently used one,
    /// so the `is_valid` flag carries no extra information for recency
    /// ordering; it matters only to policies that track usage counts.
    fn update_stats(&mut self, way: usize, row: usize, _is_valid: bool) -> Result<(), Fault> {
        self.check_bounds(way, row)?;
        self.promote(way, row)
    }

    /// Returns the way at the least-recent end of the row's order.
    fn select_way_to_evict(&self, row: usize) -> Result<usize, Fault> {
        let order = self.order.get(row).ok_or_else(|| {
            crate::sanity_fault!(format!("LRU row index {row} outside {} rows", self.set_count))
        })?;
        let way = order
            .first()
            .copied()
            .ok_or_else(|| crate::sanity_fault!("LRU asked to evict from a row with no ways"))?;
        Ok(way as usize)
    }
}

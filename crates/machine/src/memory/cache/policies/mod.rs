//! Cache replacement policies.
//!
//! Implements the algorithms that select a victim way when a block must be
//! installed into a full row.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used.
//! - `Lfu`: Least Frequently Used.
//! - `Random`: reproducible pseudo-random selection.
//!
//! Every policy is sized to (associativity, set count) at construction and
//! treats any row or way index outside those bounds as a Sanity fault; the
//! bookkeeping may never be corrupted by an out-of-range touch.

/// Least Recently Used replacement policy.
pub mod lru;

/// Least Frequently Used replacement policy.
pub mod lfu;

/// Reproducible random replacement policy.
pub mod random;

pub use lfu::LfuPolicy;
pub use lru::LruPolicy;
pub use random::RandomPolicy;

use crate::config::{CacheConfig, ReplacementKind};
use crate::fault::Fault;

/// Trait for cache replacement policies.
///
/// The cache calls [`update_stats`](ReplacementPolicy::update_stats) exactly
/// once per completed access and consults
/// [`select_way_to_evict`](ReplacementPolicy::select_way_to_evict) only when
/// the target row has no free way.
pub trait ReplacementPolicy {
    /// Records that `way` in `row` was just hit (`is_valid = true`) or just
    /// filled or invalidated (`is_valid = false`).
    ///
    /// Called exactly once per access that touches an existing or newly
    /// filled way; never speculatively.
    ///
    /// # Errors
    ///
    /// Returns a Sanity fault when `way` or `row` is outside the geometry the
    /// policy was constructed for.
    fn update_stats(&mut self, way: usize, row: usize, is_valid: bool) -> Result<(), Fault>;

    /// Returns the way in `row` to sacrifice for an incoming fill.
    ///
    /// A pure query: the bookkeeping is not modified. Must only be called
    /// when the row has no free way.
    ///
    /// # Errors
    ///
    /// Returns a Sanity fault when `row` is outside the configured bounds.
    fn select_way_to_evict(&self, row: usize) -> Result<usize, Fault>;
}

/// Builds the replacement policy chosen by `config`.
///
/// Returns `None` for a disabled cache: disabled caches never evict, and the
/// absent variant forces callers to handle that case explicitly. Otherwise the
/// returned policy is sized to the configured (associativity, set count).
pub fn from_config(config: &CacheConfig) -> Option<Box<dyn ReplacementPolicy>> {
    if !config.enabled {
        return None;
    }
    let (ways, sets) = (config.associativity, config.set_count);
    Some(match config.replacement {
        ReplacementKind::Lru => Box::new(LruPolicy::new(ways, sets)),
        ReplacementKind::Lfu => Box::new(LfuPolicy::new(ways, sets)),
        ReplacementKind::Random => Box::new(RandomPolicy::new(ways, sets)),
    })
}

//! Set-associative cache model.
//!
//! This module implements a configurable set-associative cache that fronts a
//! [`BackingMemory`]. It reproduces, deterministically, the observable
//! hit/miss/eviction behavior of the modeled hardware:
//! 1. **Decomposition:** addresses split into (tag, row, offset) as a pure
//!    function of the configured geometry.
//! 2. **Resolution:** row scan for a valid tag match; misses fill a free way
//!    or a policy-chosen victim, writing back dirty blocks first.
//! 3. **Write policies:** write-back (dirty bits, deferred propagation) and
//!    write-through (immediate propagation).
//! 4. **Inspection:** per-way tag/valid/dirty snapshots and aggregate
//!    counters for display layers.
//!
//! Any inconsistency between the policy's bookkeeping and the actual geometry
//! is reported as a Sanity fault; the access that detected it is aborted
//! rather than resolved against possibly-corrupted state.

/// Cache replacement policy implementations (LRU, LFU, Random).
pub mod policies;

use self::policies::ReplacementPolicy;
use crate::config::{CacheConfig, WritePolicy};
use crate::fault::Fault;
use crate::memory::BackingMemory;

/// One cache way: a slot holding at most one block.
struct Way {
    tag: u64,
    valid: bool,
    dirty: bool,
    data: Vec<u8>,
}

impl Way {
    fn new(block_bytes: usize) -> Self {
        Self {
            tag: 0,
            valid: false,
            dirty: false,
            data: vec![0; block_bytes],
        }
    }
}

/// Snapshot of one way's bookkeeping state, for inspection and display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WayState {
    /// Block tag; meaningless while `valid` is false.
    pub tag: u64,
    /// Whether the way holds live data.
    pub valid: bool,
    /// Whether the held block differs from backing memory (write-back only).
    pub dirty: bool,
}

/// Aggregate access counters of one cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheCounters {
    /// Completed read transactions (one per block touched).
    pub reads: u64,
    /// Completed write transactions (one per block touched).
    pub writes: u64,
    /// Transactions resolved against an already-present block.
    pub hits: u64,
    /// Transactions that required a fill.
    pub misses: u64,
}

impl CacheCounters {
    /// Total transactions seen, hits and misses alike.
    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }

    /// Fraction of transactions that hit, in `[0, 1]`; zero when idle.
    pub fn hit_rate(&self) -> f64 {
        let resolved = self.hits + self.misses;
        if resolved == 0 {
            0.0
        } else {
            self.hits as f64 / resolved as f64
        }
    }
}

/// Per-set array of ways; the backing structure the replacement policy
/// reasons about. Stored flat in row-major order.
struct CacheStore {
    ways: Vec<Way>,
    associativity: usize,
    set_count: usize,
}

impl CacheStore {
    fn new(associativity: usize, set_count: usize, block_bytes: usize) -> Self {
        let mut ways = Vec::with_capacity(associativity * set_count);
        for _ in 0..associativity * set_count {
            ways.push(Way::new(block_bytes));
        }
        Self {
            ways,
            associativity,
            set_count,
        }
    }

    fn index(&self, row: usize, way: usize) -> Result<usize, Fault> {
        crate::sanity_check!(
            row < self.set_count,
            format!("cache row index {row} outside {} rows", self.set_count)
        );
        crate::sanity_check!(
            way < self.associativity,
            format!("cache way index {way} outside {} ways", self.associativity)
        );
        Ok(row * self.associativity + way)
    }

    fn way(&self, row: usize, way: usize) -> Result<&Way, Fault> {
        let idx = self.index(row, way)?;
        Ok(&self.ways[idx])
    }

    fn way_mut(&mut self, row: usize, way: usize) -> Result<&mut Way, Fault> {
        let idx = self.index(row, way)?;
        Ok(&mut self.ways[idx])
    }

    /// Returns the way holding a valid block with the given tag, if any.
    fn find(&self, row: usize, tag: u64) -> Result<Option<usize>, Fault> {
        let base = self.index(row, 0)?;
        for way in 0..self.associativity {
            let slot = &self.ways[base + way];
            if slot.valid && slot.tag == tag {
                return Ok(Some(way));
            }
        }
        Ok(None)
    }

    /// Returns the first invalid way of the row, if any.
    fn free_way(&self, row: usize) -> Result<Option<usize>, Fault> {
        let base = self.index(row, 0)?;
        Ok((0..self.associativity).find(|&way| !self.ways[base + way].valid))
    }
}

/// Set-associative cache fronting a [`BackingMemory`].
///
/// Owns one store and one replacement policy; the backing memory itself is an
/// external collaborator passed into each operation, so several caches (e.g.
/// a program and a data cache) can front the same memory.
///
/// All behavior is deterministic given the configuration and the address
/// sequence: the Random policy draws from a fixed-seed generator owned by
/// this cache, not from external entropy.
pub struct Cache {
    config: CacheConfig,
    store: CacheStore,
    policy: Option<Box<dyn ReplacementPolicy>>,
    counters: CacheCounters,
}

impl core::fmt::Debug for Cache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Creates a cache from a validated configuration.
    ///
    /// A disabled cache allocates no ways and no policy; every access is
    /// forwarded straight to backing memory.
    ///
    /// # Errors
    ///
    /// Returns an `Input`-class fault when the configuration is rejected by
    /// [`CacheConfig::validate`].
    pub fn new(config: &CacheConfig) -> Result<Self, Fault> {
        config.validate()?;
        let store = if config.enabled {
            CacheStore::new(config.associativity, config.set_count, config.block_bytes)
        } else {
            CacheStore::new(0, 0, 0)
        };
        Ok(Self {
            config: config.clone(),
            store,
            policy: policies::from_config(config),
            counters: CacheCounters::default(),
        })
    }

    /// Returns the configuration this cache was built from.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the aggregate access counters.
    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    /// Returns the tag/valid/dirty snapshot of one way, for display.
    ///
    /// # Errors
    ///
    /// Returns a Sanity fault when `row` or `way` is outside the geometry.
    pub fn inspect_way(&self, row: usize, way: usize) -> Result<WayState, Fault> {
        let slot = self.store.way(row, way)?;
        Ok(WayState {
            tag: slot.tag,
            valid: slot.valid,
            dirty: slot.dirty,
        })
    }

    /// Splits an address into (tag, row, offset) per the configured geometry.
    ///
    /// Must agree with the layout of the fronted memory: consecutive blocks
    /// walk the rows in order, so `row = (addr / block) mod sets` and
    /// `tag = addr / (block * sets)`.
    fn decompose(&self, address: u64) -> (u64, usize, usize) {
        let block = self.config.block_bytes as u64;
        let sets = self.config.set_count as u64;
        let tag = address / (block * sets);
        let row = ((address / block) % sets) as usize;
        let offset = (address % block) as usize;
        (tag, row, offset)
    }

    /// Reconstructs the base address of the block identified by (tag, row).
    fn block_base(&self, tag: u64, row: usize) -> u64 {
        let block = self.config.block_bytes as u64;
        let sets = self.config.set_count as u64;
        (tag * sets + row as u64) * block
    }

    fn policy_update(&mut self, way: usize, row: usize, is_valid: bool) -> Result<(), Fault> {
        match self.policy.as_deref_mut() {
            Some(policy) => policy.update_stats(way, row, is_valid),
            None => Err(crate::sanity_fault!(
                "replacement policy missing on an enabled cache"
            )),
        }
    }

    fn select_victim(&self, row: usize) -> Result<usize, Fault> {
        match self.policy.as_deref() {
            Some(policy) => policy.select_way_to_evict(row),
            None => Err(crate::sanity_fault!(
                "replacement policy missing on an enabled cache"
            )),
        }
    }

    /// Resolves (tag, row) to a way holding the block, filling on a miss.
    ///
    /// On a hit the policy is informed with `is_valid = true`; on a miss the
    /// victim (a free way if one exists) is written back first when dirty
    /// under write-back, refilled from memory, and the policy is informed
    /// with `is_valid = false`. Exactly one policy update per transaction.
    ///
    /// Returns the way index, whether it was a hit, and the extra cycles
    /// spent on backing-memory transactions.
    fn lookup_or_fill(
        &mut self,
        memory: &mut dyn BackingMemory,
        tag: u64,
        row: usize,
    ) -> Result<(usize, bool, u64), Fault> {
        if let Some(way) = self.store.find(row, tag)? {
            self.policy_update(way, row, true)?;
            tracing::trace!(row, way, tag, "cache hit");
            return Ok((way, true, 0));
        }

        let mut extra = 0;
        let way = match self.store.free_way(row)? {
            Some(way) => way,
            None => self.select_victim(row)?,
        };

        let writeback = {
            let victim = self.store.way(row, way)?;
            if victim.valid && victim.dirty && self.config.write_policy == WritePolicy::WriteBack
            {
                Some(self.block_base(victim.tag, row))
            } else {
                None
            }
        };
        if let Some(base) = writeback {
            let victim = self.store.way(row, way)?;
            memory.write(base, &victim.data)?;
            extra += memory.latency();
            tracing::debug!(row, way, base, "wrote back dirty victim block");
        }

        let base = self.block_base(tag, row);
        {
            let slot = self.store.way_mut(row, way)?;
            memory.read(base, &mut slot.data)?;
            slot.tag = tag;
            slot.valid = true;
            slot.dirty = false;
        }
        extra += memory.latency();
        self.policy_update(way, row, false)?;
        tracing::trace!(row, way, tag, "cache miss, block filled");
        Ok((way, false, extra))
    }

    /// Reads `buf.len()` bytes at `address` through the cache.
    ///
    /// Ranges spanning block boundaries are split into one transaction per
    /// block touched; each transaction is counted separately.
    ///
    /// # Arguments
    ///
    /// * `memory` - The backing memory this cache fronts.
    /// * `address` - Start address of the range.
    /// * `buf` - Destination buffer; its length determines the range size.
    ///
    /// # Returns
    ///
    /// `(hit, cycles)` where `hit` is `true` only when every transaction hit
    /// and `cycles` is the total configured latency spent.
    ///
    /// # Errors
    ///
    /// Propagates backing-memory faults (e.g. `OutOfMemoryAccess`) and Sanity
    /// faults from corrupted bookkeeping.
    pub fn read(
        &mut self,
        memory: &mut dyn BackingMemory,
        address: u64,
        buf: &mut [u8],
    ) -> Result<(bool, u64), Fault> {
        if !self.config.enabled {
            memory.read(address, buf)?;
            self.counters.reads += 1;
            return Ok((false, memory.latency()));
        }

        let mut all_hit = true;
        let mut cycles = 0;
        let mut pos = 0;
        while pos < buf.len() {
            let addr = address + pos as u64;
            let (tag, row, offset) = self.decompose(addr);
            let chunk = (self.config.block_bytes - offset).min(buf.len() - pos);
            let (way, hit, extra) = self.lookup_or_fill(memory, tag, row)?;
            let slot = self.store.way(row, way)?;
            buf[pos..pos + chunk].copy_from_slice(&slot.data[offset..offset + chunk]);
            self.counters.reads += 1;
            if hit {
                self.counters.hits += 1;
            } else {
                self.counters.misses += 1;
                all_hit = false;
            }
            cycles += self.config.access_latency + extra;
            pos += chunk;
        }
        Ok((all_hit, cycles))
    }

    /// Writes `data` at `address` through the cache.
    ///
    /// Write misses allocate under both write policies. Under write-back the
    /// touched block is marked dirty; under write-through the store is also
    /// forwarded to backing memory immediately and the block stays clean.
    ///
    /// # Arguments
    ///
    /// * `memory` - The backing memory this cache fronts.
    /// * `address` - Start address of the range.
    /// * `data` - Bytes to store.
    ///
    /// # Returns
    ///
    /// `(hit, cycles)`, as for [`Cache::read`].
    ///
    /// # Errors
    ///
    /// Propagates backing-memory faults and Sanity faults from corrupted
    /// bookkeeping.
    pub fn write(
        &mut self,
        memory: &mut dyn BackingMemory,
        address: u64,
        data: &[u8],
    ) -> Result<(bool, u64), Fault> {
        if !self.config.enabled {
            memory.write(address, data)?;
            self.counters.writes += 1;
            return Ok((false, memory.latency()));
        }

        let mut all_hit = true;
        let mut cycles = 0;
        let mut pos = 0;
        while pos < data.len() {
            let addr = address + pos as u64;
            let (tag, row, offset) = self.decompose(addr);
            let chunk = (self.config.block_bytes - offset).min(data.len() - pos);
            let (way, hit, extra) = self.lookup_or_fill(memory, tag, row)?;
            {
                let slot = self.store.way_mut(row, way)?;
                slot.data[offset..offset + chunk].copy_from_slice(&data[pos..pos + chunk]);
                if self.config.write_policy == WritePolicy::WriteBack {
                    slot.dirty = true;
                }
            }
            if self.config.write_policy == WritePolicy::WriteThrough {
                memory.write(addr, &data[pos..pos + chunk])?;
                cycles += memory.latency();
            }
            self.counters.writes += 1;
            if hit {
                self.counters.hits += 1;
            } else {
                self.counters.misses += 1;
                all_hit = false;
            }
            cycles += self.config.access_latency + extra;
            pos += chunk;
        }
        Ok((all_hit, cycles))
    }

    /// Writes every dirty block back to memory without invalidating anything.
    ///
    /// # Errors
    ///
    /// Propagates backing-memory faults and Sanity faults.
    pub fn sync(&mut self, memory: &mut dyn BackingMemory) -> Result<(), Fault> {
        if !self.config.enabled {
            return Ok(());
        }
        for row in 0..self.config.set_count {
            for way in 0..self.config.associativity {
                let base = {
                    let slot = self.store.way(row, way)?;
                    if slot.valid && slot.dirty {
                        Some(self.block_base(slot.tag, row))
                    } else {
                        None
                    }
                };
                if let Some(base) = base {
                    {
                        let slot = self.store.way(row, way)?;
                        memory.write(base, &slot.data)?;
                    }
                    self.store.way_mut(row, way)?.dirty = false;
                    tracing::debug!(row, way, base, "synced dirty block");
                }
            }
        }
        Ok(())
    }

    /// Writes every dirty block back, then invalidates the whole cache and
    /// resets the replacement bookkeeping. Counters are preserved.
    ///
    /// # Errors
    ///
    /// Propagates backing-memory faults and Sanity faults.
    pub fn flush(&mut self, memory: &mut dyn BackingMemory) -> Result<(), Fault> {
        self.sync(memory)?;
        for slot in &mut self.store.ways {
            slot.valid = false;
            slot.dirty = false;
        }
        self.policy = policies::from_config(&self.config);
        Ok(())
    }
}

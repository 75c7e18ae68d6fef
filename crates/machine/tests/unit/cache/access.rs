//! Cache Access Tests.
//!
//! Drives the full cache model through a real `MainMemory`: address
//! decomposition, hit/miss resolution, write-back and write-through
//! semantics, eviction with dirty write-back, cycle accounting, counters,
//! and sync/flush behavior.

use edusim_machine::config::{CacheConfig, ReplacementKind, WritePolicy};
use edusim_machine::fault::FaultKind;
use edusim_machine::memory::cache::{Cache, WayState};
use edusim_machine::memory::{BackingMemory, MainMemory};

/// Enabled cache with the given geometry, write-back, LRU, 1-cycle access.
fn cache_config(associativity: usize, set_count: usize, block_bytes: usize) -> CacheConfig {
    CacheConfig {
        enabled: true,
        associativity,
        set_count,
        block_bytes,
        ..CacheConfig::default()
    }
}

/// 256-byte memory with a 10-cycle latency, prefilled with `i as u8` at
/// address `i` so data movement is observable.
fn patterned_memory() -> MainMemory {
    let mut memory = MainMemory::new(256, 10);
    let pattern: Vec<u8> = (0..=255).collect();
    memory.write(0, &pattern).unwrap();
    memory
}

// ══════════════════════════════════════════════════════════
// 1. Hit/miss resolution and timing
// ══════════════════════════════════════════════════════════

#[test]
fn cold_miss_then_hit() {
    let mut memory = patterned_memory();
    let mut cache = Cache::new(&cache_config(2, 2, 4)).unwrap();
    let mut buf = [0u8; 4];

    // Cold cache: fill (10) + cache access (1).
    let (hit, cycles) = cache.read(&mut memory, 0, &mut buf).unwrap();
    assert!(!hit);
    assert_eq!(cycles, 11);
    assert_eq!(buf, [0, 1, 2, 3]);

    // Same block: served from the cache alone.
    let (hit, cycles) = cache.read(&mut memory, 0, &mut buf).unwrap();
    assert!(hit);
    assert_eq!(cycles, 1);

    let counters = cache.counters();
    assert_eq!(counters.reads, 2);
    assert_eq!(counters.hits, 1);
    assert_eq!(counters.misses, 1);
    assert_eq!(counters.accesses(), 2);
    assert!((counters.hit_rate() - 0.5).abs() < f64::EPSILON);
}

/// A different offset inside an already-cached block still hits.
#[test]
fn offset_within_block_hits() {
    let mut memory = patterned_memory();
    let mut cache = Cache::new(&cache_config(1, 1, 8)).unwrap();
    let mut buf = [0u8; 4];
    cache.read(&mut memory, 0, &mut buf).unwrap();

    let mut pair = [0u8; 2];
    let (hit, cycles) = cache.read(&mut memory, 5, &mut pair).unwrap();
    assert!(hit);
    assert_eq!(cycles, 1);
    assert_eq!(pair, [5, 6]);
}

/// Consecutive blocks walk the rows; the tag distinguishes aliased blocks.
#[test]
fn decomposition_maps_rows_and_tags() {
    let mut memory = patterned_memory();
    let mut cache = Cache::new(&cache_config(1, 2, 4)).unwrap();
    let mut buf = [0u8; 4];

    cache.read(&mut memory, 0, &mut buf).unwrap(); // row 0, tag 0
    cache.read(&mut memory, 4, &mut buf).unwrap(); // row 1, tag 0
    cache.read(&mut memory, 8, &mut buf).unwrap(); // row 0, tag 1 → evicts
    assert_eq!(buf, [8, 9, 10, 11]);

    assert_eq!(
        cache.inspect_way(0, 0).unwrap(),
        WayState { tag: 1, valid: true, dirty: false }
    );
    assert_eq!(
        cache.inspect_way(1, 0).unwrap(),
        WayState { tag: 0, valid: true, dirty: false }
    );
}

/// A range spanning block boundaries is split into one transaction per
/// block, each counted and timed separately.
#[test]
fn spanning_access_splits_per_block() {
    let mut memory = patterned_memory();
    let mut cache = Cache::new(&cache_config(2, 2, 4)).unwrap();

    // Bytes 2..10 touch blocks at 0, 4, and 8: three cold transactions.
    let mut buf = [0u8; 8];
    let (hit, cycles) = cache.read(&mut memory, 2, &mut buf).unwrap();
    assert!(!hit);
    assert_eq!(cycles, 3 * 11);
    assert_eq!(buf, [2, 3, 4, 5, 6, 7, 8, 9]);

    let counters = cache.counters();
    assert_eq!(counters.reads, 3);
    assert_eq!(counters.misses, 3);
}

// ══════════════════════════════════════════════════════════
// 2. Write policies
// ══════════════════════════════════════════════════════════

#[test]
fn write_back_defers_memory_update() {
    let mut memory = MainMemory::new(64, 10);
    let mut cache = Cache::new(&cache_config(1, 1, 4)).unwrap();

    let (hit, cycles) = cache.write(&mut memory, 0, &[1, 2, 3, 4]).unwrap();
    assert!(!hit);
    assert_eq!(cycles, 11); // allocate fill + cache access
    assert!(cache.inspect_way(0, 0).unwrap().dirty);

    // Memory still holds the old bytes until the block is written back.
    let mut raw = [0xFFu8; 4];
    memory.read(0, &mut raw).unwrap();
    assert_eq!(raw, [0; 4]);

    cache.sync(&mut memory).unwrap();
    memory.read(0, &mut raw).unwrap();
    assert_eq!(raw, [1, 2, 3, 4]);
    // Sync cleans but does not invalidate.
    let state = cache.inspect_way(0, 0).unwrap();
    assert!(state.valid);
    assert!(!state.dirty);
}

#[test]
fn write_back_evicts_dirty_victim_to_memory() {
    let mut memory = MainMemory::new(64, 10);
    let mut cache = Cache::new(&cache_config(1, 1, 4)).unwrap();

    cache.write(&mut memory, 0, &[1, 2, 3, 4]).unwrap();

    // Reading an aliasing block evicts the dirty victim: write-back (10) +
    // fill (10) + cache access (1).
    let mut buf = [0u8; 4];
    let (hit, cycles) = cache.read(&mut memory, 16, &mut buf).unwrap();
    assert!(!hit);
    assert_eq!(cycles, 21);

    let mut raw = [0u8; 4];
    memory.read(0, &mut raw).unwrap();
    assert_eq!(raw, [1, 2, 3, 4]);

    // Evicting the clean block costs only the fill.
    let (_, cycles) = cache.read(&mut memory, 0, &mut buf).unwrap();
    assert_eq!(cycles, 11);
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn write_through_forwards_immediately() {
    let mut memory = MainMemory::new(64, 10);
    let config = CacheConfig {
        write_policy: WritePolicy::WriteThrough,
        ..cache_config(1, 1, 4)
    };
    let mut cache = Cache::new(&config).unwrap();

    // Miss: allocate fill (10) + forward (10) + cache access (1).
    let (hit, cycles) = cache.write(&mut memory, 0, &[7, 7, 7, 7]).unwrap();
    assert!(!hit);
    assert_eq!(cycles, 21);
    assert!(!cache.inspect_way(0, 0).unwrap().dirty);

    let mut raw = [0u8; 4];
    memory.read(0, &mut raw).unwrap();
    assert_eq!(raw, [7; 4]);

    // Hit: forward (10) + cache access (1); the block stays clean.
    let (hit, cycles) = cache.write(&mut memory, 0, &[8, 8, 8, 8]).unwrap();
    assert!(hit);
    assert_eq!(cycles, 11);
    assert!(!cache.inspect_way(0, 0).unwrap().dirty);
    memory.read(0, &mut raw).unwrap();
    assert_eq!(raw, [8; 4]);
}

/// Write misses allocate under both write policies: the next read of the
/// written block hits.
#[test]
fn write_misses_allocate() {
    for policy in [WritePolicy::WriteBack, WritePolicy::WriteThrough] {
        let mut memory = MainMemory::new(64, 10);
        let config = CacheConfig {
            write_policy: policy,
            ..cache_config(1, 1, 4)
        };
        let mut cache = Cache::new(&config).unwrap();

        cache.write(&mut memory, 8, &[5, 6, 7, 8]).unwrap();
        let mut buf = [0u8; 4];
        let (hit, _) = cache.read(&mut memory, 8, &mut buf).unwrap();
        assert!(hit, "write-allocate under {policy:?}");
        assert_eq!(buf, [5, 6, 7, 8]);
    }
}

// ══════════════════════════════════════════════════════════
// 3. Replacement integration
// ══════════════════════════════════════════════════════════

#[test]
fn lru_evicts_least_recent_block() {
    let mut memory = patterned_memory();
    let mut cache = Cache::new(&cache_config(2, 1, 4)).unwrap();
    let mut buf = [0u8; 4];

    cache.read(&mut memory, 0, &mut buf).unwrap(); // tag 0 → way 0
    cache.read(&mut memory, 4, &mut buf).unwrap(); // tag 1 → way 1
    cache.read(&mut memory, 0, &mut buf).unwrap(); // hit, tag 0 now most recent
    cache.read(&mut memory, 8, &mut buf).unwrap(); // tag 2 → evicts tag 1

    assert_eq!(cache.inspect_way(0, 0).unwrap().tag, 0);
    assert_eq!(cache.inspect_way(0, 1).unwrap().tag, 2);
}

/// The Random policy draws from a fixed-seed generator, so two identical
/// caches fed the same access sequence end in identical states.
#[test]
fn random_replacement_is_reproducible() {
    let config = CacheConfig {
        replacement: ReplacementKind::Random,
        ..cache_config(2, 2, 4)
    };
    let addresses = [0u64, 16, 32, 48, 0, 64, 16, 80, 96, 0];

    let run = || {
        let mut memory = patterned_memory();
        let mut cache = Cache::new(&config).unwrap();
        let mut buf = [0u8; 4];
        for &addr in &addresses {
            cache.read(&mut memory, addr, &mut buf).unwrap();
        }
        let mut states = Vec::new();
        for row in 0..2 {
            for way in 0..2 {
                states.push(cache.inspect_way(row, way).unwrap());
            }
        }
        (cache.counters(), states)
    };

    assert_eq!(run(), run());
}

// ══════════════════════════════════════════════════════════
// 4. Disabled cache and shared memory
// ══════════════════════════════════════════════════════════

#[test]
fn disabled_cache_forwards_to_memory() {
    let mut memory = patterned_memory();
    let mut cache = Cache::new(&CacheConfig::default()).unwrap();

    let mut buf = [0u8; 4];
    let (hit, cycles) = cache.read(&mut memory, 8, &mut buf).unwrap();
    assert!(!hit);
    assert_eq!(cycles, 10); // memory latency alone
    assert_eq!(buf, [8, 9, 10, 11]);

    cache.write(&mut memory, 8, &[0; 4]).unwrap();
    memory.read(8, &mut buf).unwrap();
    assert_eq!(buf, [0; 4]);

    // Accesses are counted, but never as hits or misses.
    let counters = cache.counters();
    assert_eq!(counters.reads, 1);
    assert_eq!(counters.writes, 1);
    assert_eq!(counters.hits, 0);
    assert_eq!(counters.misses, 0);
    assert!(counters.hit_rate().abs() < f64::EPSILON);
}

/// A program cache and a data cache front the same backing memory; a stored
/// value propagated by the data cache is visible to program fetches.
#[test]
fn split_caches_share_backing_memory() {
    let mut memory = MainMemory::new(64, 10);
    let data_config = CacheConfig {
        write_policy: WritePolicy::WriteThrough,
        ..cache_config(1, 2, 4)
    };
    let mut data_cache = Cache::new(&data_config).unwrap();
    let mut program_cache = Cache::new(&cache_config(1, 2, 4)).unwrap();

    data_cache.write(&mut memory, 4, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

    let mut fetched = [0u8; 4];
    program_cache.read(&mut memory, 4, &mut fetched).unwrap();
    assert_eq!(fetched, [0xDE, 0xAD, 0xBE, 0xEF]);
}

// ══════════════════════════════════════════════════════════
// 5. Flush, faults, and construction
// ══════════════════════════════════════════════════════════

#[test]
fn flush_writes_back_and_invalidates() {
    let mut memory = MainMemory::new(64, 10);
    let mut cache = Cache::new(&cache_config(2, 1, 4)).unwrap();

    cache.write(&mut memory, 0, &[1, 1, 1, 1]).unwrap();
    let before = cache.counters();

    cache.flush(&mut memory).unwrap();

    let mut raw = [0u8; 4];
    memory.read(0, &mut raw).unwrap();
    assert_eq!(raw, [1; 4]);
    assert!(!cache.inspect_way(0, 0).unwrap().valid);
    assert!(!cache.inspect_way(0, 1).unwrap().valid);
    // Counters survive a flush.
    assert_eq!(cache.counters(), before);

    // The flushed block must be refetched.
    let mut buf = [0u8; 4];
    let (hit, _) = cache.read(&mut memory, 0, &mut buf).unwrap();
    assert!(!hit);
    assert_eq!(buf, [1; 4]);
}

#[test]
fn backing_fault_propagates() {
    let mut memory = MainMemory::new(64, 10);
    let mut cache = Cache::new(&cache_config(1, 1, 16)).unwrap();
    let mut buf = [0u8; 4];
    // The block fill at base 96 overruns the 64-byte memory.
    let fault = cache.read(&mut memory, 100, &mut buf).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::OutOfMemoryAccess);
}

#[test]
fn construction_rejects_invalid_geometry() {
    let config = CacheConfig {
        enabled: true,
        associativity: 0,
        ..CacheConfig::default()
    };
    assert_eq!(Cache::new(&config).unwrap_err().kind(), FaultKind::Input);
}

#[test]
fn inspect_rejects_out_of_range_way() {
    let cache = Cache::new(&cache_config(2, 2, 4)).unwrap();
    assert_eq!(
        cache.inspect_way(0, 2).unwrap_err().kind(),
        FaultKind::Sanity
    );
}

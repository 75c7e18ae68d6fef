//! Configuration for the simulated machine's memory hierarchy.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the memory subsystem. It provides:
//! 1. **Defaults:** Baseline constants for cache geometry and memory timing.
//! 2. **Structures:** Hierarchical config for the program cache, data cache,
//!    and backing memory.
//! 3. **Enums:** Write policy and replacement policy kinds.
//!
//! Configuration is supplied as JSON (typically from a front end or a test
//! harness) or via `MachineConfig::default()`. Geometry is validated before a
//! cache is constructed; an enabled cache with degenerate geometry is rejected
//! with an Input-class fault.

use serde::Deserialize;

use crate::fault::Fault;

/// Default configuration constants for the memory subsystem.
mod defaults {
    /// Default cache associativity (1 way = direct-mapped).
    pub const ASSOCIATIVITY: usize = 1;

    /// Default number of cache sets (rows).
    pub const SET_COUNT: usize = 1;

    /// Default cache block size in bytes.
    pub const BLOCK_BYTES: usize = 16;

    /// Default cache access latency in cycles.
    pub const ACCESS_LATENCY: u64 = 1;

    /// Default backing memory size (64 KiB).
    pub const MEMORY_SIZE: usize = 64 * 1024;

    /// Default backing memory access latency in cycles.
    pub const MEMORY_LATENCY: u64 = 10;
}

/// Write propagation policy of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum WritePolicy {
    /// Writes update the cached block and mark it dirty; the block is written
    /// to backing memory only when evicted or explicitly synced.
    #[default]
    #[serde(alias = "WB")]
    WriteBack,
    /// Writes update the cached block and are forwarded to backing memory
    /// immediately; blocks are never dirty.
    #[serde(alias = "WT")]
    WriteThrough,
}

/// Cache replacement policy algorithms.
///
/// Specifies the algorithm used to select which way to sacrifice when a new
/// block must be installed in a full row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementKind {
    /// Least Recently Used: evicts the way touched longest ago.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// Least Frequently Used: evicts the way with the fewest hits since it
    /// was filled; unused ways always outrank used ones.
    #[serde(alias = "Lfu")]
    Lfu,
    /// Random selection from a reproducible, per-cache generator.
    #[serde(alias = "Random")]
    Random,
}

/// Geometry and policy choice of one cache instance.
///
/// Treated as immutable once a cache has been constructed from it. Invalid
/// combinations (an *enabled* cache with zero associativity, zero sets, or a
/// zero-byte block) are rejected by [`CacheConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Enable this cache. A disabled cache forwards every access straight to
    /// backing memory and never evicts.
    #[serde(default)]
    pub enabled: bool,

    /// Associativity (number of ways per row).
    #[serde(default = "CacheConfig::default_associativity")]
    pub associativity: usize,

    /// Number of sets (rows).
    #[serde(default = "CacheConfig::default_set_count")]
    pub set_count: usize,

    /// Block size in bytes.
    #[serde(default = "CacheConfig::default_block_bytes")]
    pub block_bytes: usize,

    /// Write propagation policy.
    #[serde(default)]
    pub write_policy: WritePolicy,

    /// Replacement policy kind.
    #[serde(default)]
    pub replacement: ReplacementKind,

    /// Access latency in cycles charged per block transaction.
    #[serde(default = "CacheConfig::default_access_latency")]
    pub access_latency: u64,
}

impl CacheConfig {
    /// Returns the default associativity.
    fn default_associativity() -> usize {
        defaults::ASSOCIATIVITY
    }

    /// Returns the default set count.
    fn default_set_count() -> usize {
        defaults::SET_COUNT
    }

    /// Returns the default block size in bytes.
    fn default_block_bytes() -> usize {
        defaults::BLOCK_BYTES
    }

    /// Returns the default access latency in cycles.
    fn default_access_latency() -> u64 {
        defaults::ACCESS_LATENCY
    }

    /// Checks the configured geometry.
    ///
    /// A disabled cache is always acceptable. An enabled cache must have at
    /// least one way, at least one set, and a non-empty block.
    ///
    /// # Errors
    ///
    /// Returns an `Input`-class [`Fault`] describing the first rejected field.
    pub fn validate(&self) -> Result<(), Fault> {
        if !self.enabled {
            return Ok(());
        }
        if self.associativity < 1 {
            return Err(crate::fault!(
                Input,
                "cache enabled with zero associativity"
            ));
        }
        if self.set_count < 1 {
            return Err(crate::fault!(Input, "cache enabled with zero sets"));
        }
        if self.block_bytes < 1 {
            return Err(crate::fault!(
                Input,
                "cache enabled with a zero-byte block size"
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    /// Creates a default cache configuration: disabled, direct-mapped, one
    /// set, 16-byte blocks, write-back, LRU replacement.
    fn default() -> Self {
        Self {
            enabled: false,
            associativity: defaults::ASSOCIATIVITY,
            set_count: defaults::SET_COUNT,
            block_bytes: defaults::BLOCK_BYTES,
            write_policy: WritePolicy::default(),
            replacement: ReplacementKind::default(),
            access_latency: defaults::ACCESS_LATENCY,
        }
    }
}

/// Backing memory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Memory size in bytes.
    #[serde(default = "MemoryConfig::default_size")]
    pub size_bytes: usize,

    /// Access latency in cycles charged per memory transaction.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,
}

impl MemoryConfig {
    /// Returns the default memory size in bytes.
    fn default_size() -> usize {
        defaults::MEMORY_SIZE
    }

    /// Returns the default memory latency in cycles.
    fn default_latency() -> u64 {
        defaults::MEMORY_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size_bytes: defaults::MEMORY_SIZE,
            latency: defaults::MEMORY_LATENCY,
        }
    }
}

/// Root configuration for one simulated machine's memory subsystem.
///
/// The machine carries a split cache: one instance in front of instruction
/// fetches and one in front of data accesses, both fronting the same backing
/// memory.
///
/// # Examples
///
/// ```
/// use edusim_machine::config::{MachineConfig, ReplacementKind, WritePolicy};
///
/// let json = r#"{
///     "cache_data": {
///         "enabled": true,
///         "associativity": 2,
///         "set_count": 4,
///         "block_bytes": 16,
///         "write_policy": "WriteBack",
///         "replacement": "LRU"
///     },
///     "memory": { "size_bytes": 4096, "latency": 8 }
/// }"#;
///
/// let config: MachineConfig = serde_json::from_str(json).unwrap();
/// assert!(config.cache_data.enabled);
/// assert!(!config.cache_program.enabled);
/// assert_eq!(config.cache_data.replacement, ReplacementKind::Lru);
/// assert_eq!(config.cache_data.write_policy, WritePolicy::WriteBack);
/// assert_eq!(config.memory.latency, 8);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MachineConfig {
    /// Cache fronting instruction fetches.
    #[serde(default)]
    pub cache_program: CacheConfig,

    /// Cache fronting data reads and writes.
    #[serde(default)]
    pub cache_data: CacheConfig,

    /// Backing memory parameters.
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl MachineConfig {
    /// Validates every cache in the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `Input`-class [`Fault`] found.
    pub fn validate(&self) -> Result<(), Fault> {
        self.cache_program.validate()?;
        self.cache_data.validate()
    }
}

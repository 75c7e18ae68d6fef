//! Memory-hierarchy model of a teaching machine simulator.
//!
//! This crate implements the memory subsystem of an educational processor
//! simulator: a configurable set-associative cache layer (split into a
//! program and a data cache), pluggable replacement policies, a flat backing
//! memory, and the typed fault taxonomy every component reports through.
//!
//! # Architecture
//!
//! - [`config`]: JSON-deserializable configuration of cache geometry, write
//!   and replacement policies, and backing memory parameters.
//! - [`memory`]: the [`BackingMemory`] trait, the flat [`MainMemory`], and
//!   the [`Cache`] model with its replacement policies.
//! - [`fault`]: the closed [`FaultKind`] taxonomy and the raising macros.
//!
//! # Determinism
//!
//! Every run is reproducible: given the same configuration and the same
//! access sequence, hit/miss outcomes, eviction choices (including the
//! Random policy, which uses a fixed-seed generator), counters, and cycle
//! totals are identical.
//!
//! # Examples
//!
//! ```
//! use edusim_machine::config::CacheConfig;
//! use edusim_machine::memory::cache::Cache;
//! use edusim_machine::memory::MainMemory;
//!
//! # fn main() -> Result<(), edusim_machine::fault::Fault> {
//! let config = CacheConfig {
//!     enabled: true,
//!     associativity: 2,
//!     set_count: 4,
//!     block_bytes: 16,
//!     ..CacheConfig::default()
//! };
//! let mut memory = MainMemory::new(4096, 10);
//! let mut cache = Cache::new(&config)?;
//!
//! let mut word = [0u8; 4];
//! let (hit, _cycles) = cache.read(&mut memory, 0x40, &mut word)?;
//! assert!(!hit); // cold cache
//! let (hit, _cycles) = cache.read(&mut memory, 0x40, &mut word)?;
//! assert!(hit);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod fault;
pub mod memory;

pub use config::MachineConfig;
pub use fault::{Fault, FaultKind};
pub use memory::cache::Cache;
pub use memory::{BackingMemory, MainMemory};

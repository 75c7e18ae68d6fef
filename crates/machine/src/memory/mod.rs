//! Backing memory layer fronted by the caches.
//!
//! This module defines the interface the cache consumes from the rest of the
//! machine and a flat main-memory implementation of it. It provides:
//! 1. **Access Classification:** [`AccessType`] distinguishing fetches, reads,
//!    and writes.
//! 2. **Backing Interface:** the [`BackingMemory`] trait with byte-buffer
//!    `read`/`write` and a per-transaction latency.
//! 3. **Main Memory:** [`MainMemory`], a bounds-checked byte array raising
//!    `OutOfMemoryAccess` faults.

/// Set-associative cache model and replacement policies.
pub mod cache;

use crate::config::MemoryConfig;
use crate::fault::Fault;

/// Type of memory access operation.
///
/// Used by the machine's front ends to route an access to the program or the
/// data cache and to account for it in the right counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch; served by the program cache.
    Fetch,
    /// Data load; served by the data cache.
    Read,
    /// Data store; served by the data cache.
    Write,
}

/// Interface the cache consumes from the backing memory layer.
///
/// Addresses are unsigned and fixed-width; a transaction covers `buf.len()`
/// (or `data.len()`) contiguous bytes. Implementations decide what lies behind
/// an address, but address decomposition performed by the cache must agree
/// with whatever layout the implementation uses.
pub trait BackingMemory {
    /// Reads `buf.len()` bytes starting at `address` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns an `OutOfMemoryAccess` fault when any byte of the range falls
    /// outside the memory.
    fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<(), Fault>;

    /// Writes `data` starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns an `OutOfMemoryAccess` fault when any byte of the range falls
    /// outside the memory.
    fn write(&mut self, address: u64, data: &[u8]) -> Result<(), Fault>;

    /// Access latency in cycles charged per transaction.
    fn latency(&self) -> u64;
}

/// Flat, bounds-checked main memory.
///
/// The simplest [`BackingMemory`]: a zero-initialized byte vector with a fixed
/// per-transaction latency.
pub struct MainMemory {
    data: Vec<u8>,
    latency: u64,
}

impl MainMemory {
    /// Creates a zero-filled memory of `size_bytes` with the given latency.
    pub fn new(size_bytes: usize, latency: u64) -> Self {
        Self {
            data: vec![0; size_bytes],
            latency,
        }
    }

    /// Creates a memory from a [`MemoryConfig`].
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.size_bytes, config.latency)
    }

    /// Returns the memory size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Resolves `address..address + len` to an in-bounds byte range.
    fn check_range(&self, address: u64, len: usize) -> Result<(usize, usize), Fault> {
        let start = usize::try_from(address).ok();
        let end = start.and_then(|s| s.checked_add(len));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.data.len() => Ok((start, end)),
            _ => Err(crate::fault!(
                OutOfMemoryAccess,
                format!(
                    "access of {len} bytes at {address:#x} falls outside memory of {} bytes",
                    self.data.len()
                )
            )),
        }
    }
}

impl BackingMemory for MainMemory {
    fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<(), Fault> {
        let (start, end) = self.check_range(address, buf.len())?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write(&mut self, address: u64, data: &[u8]) -> Result<(), Fault> {
        let (start, end) = self.check_range(address, data.len())?;
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn latency(&self) -> u64 {
        self.latency
    }
}

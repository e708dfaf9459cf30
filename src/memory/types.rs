/*!
 * Memory Types
 * Block metadata, handles, and statistics for the collected heap
 */

use crate::core::limits::{PRESSURE_CRITICAL, PRESSURE_HIGH, PRESSURE_MEDIUM};
use crate::core::serde::hex_address;
use crate::core::types::{Address, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes, available {available} bytes ({used} used / {total} total)")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("Run a collection cycle and retry, or raise RGC_ARENA_CAPACITY.")
    )]
    OutOfMemory {
        requested: usize,
        available: usize,
        used: usize,
        total: usize,
    },

    #[error("Invalid pointer: 0x{0:x} is not the start of a live block")]
    #[diagnostic(
        code(memory::invalid_pointer),
        help("Only addresses returned by malloc may be freed, and each exactly once.")
    )]
    InvalidPointer(usize),

    #[error("Zero-sized allocation requested")]
    #[diagnostic(code(memory::zero_sized))]
    ZeroSizedAllocation,

    #[error("Allocation of {0} bytes overflows the platform layout limits")]
    #[diagnostic(code(memory::layout_overflow))]
    LayoutOverflow(usize),
}

impl MemoryError {
    /// Stable numeric code exposed through the C surface
    pub fn error_code(&self) -> i32 {
        match self {
            MemoryError::OutOfMemory { .. } => 1,
            MemoryError::InvalidPointer(_) => 2,
            MemoryError::ZeroSizedAllocation => 3,
            MemoryError::LayoutOverflow(_) => 4,
        }
    }
}

/// Opaque handle to a live block, keyed by its start address
///
/// Handles are only minted by the block table, so holding one means the
/// block existed when the handle was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHandle(Address);

impl BlockHandle {
    /// Start address of the block
    #[inline]
    pub fn address(self) -> Address {
        self.0
    }
}

impl std::fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// One outstanding allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapBlock {
    #[serde(with = "hex_address")]
    pub address: Address,
    /// Requested length; the range used for containment and scanning
    pub size: Size,
    /// Size-class length charged to the arena
    pub capacity: Size,
    pub marked: bool,
    pub freed: bool,
}

impl HeapBlock {
    pub(crate) fn new(address: Address, size: Size, capacity: Size) -> Self {
        Self {
            address,
            size,
            capacity,
            marked: false,
            freed: false,
        }
    }

    /// One past the last payload byte
    #[inline]
    pub fn end(&self) -> Address {
        self.address + self.size
    }

    #[inline]
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.address && addr < self.end()
    }

    #[inline]
    pub fn handle(&self) -> BlockHandle {
        BlockHandle(self.address)
    }

    pub(crate) fn into_freed(mut self) -> Self {
        self.freed = true;
        self
    }
}

/// Arena and table statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memory: usize,
    pub used_memory: usize,
    pub available_memory: usize,
    pub usage_percentage: f64,
    pub live_blocks: usize,
    pub requested_bytes: usize,
    pub free_list_chunks: usize,
}

impl MemoryStats {
    pub fn memory_pressure(&self) -> MemoryPressure {
        MemoryPressure::from_ratio(self.usage_percentage / 100.0)
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= PRESSURE_CRITICAL {
            MemoryPressure::Critical
        } else if ratio >= PRESSURE_HIGH {
            MemoryPressure::High
        } else if ratio >= PRESSURE_MEDIUM {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Result of returning a block to the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasedBlock {
    /// Bytes the caller asked for
    pub requested: Size,
    /// Bytes the arena got back
    pub capacity: Size,
}

/*!
 * Memory Traits
 * Seams between the block table, the scanner, and the collector
 */

use super::types::*;
use crate::core::types::{Address, Size};

/// Block allocator interface
pub trait Allocator {
    /// Allocate a block of `size` bytes
    fn allocate(&mut self, size: Size) -> MemoryResult<BlockHandle>;

    /// Release the block starting exactly at `address`
    fn release(&mut self, address: Address) -> MemoryResult<ReleasedBlock>;

    /// Check if an address is the start of a live block
    fn is_valid(&self, address: Address) -> bool;

    /// Get the requested size of a live block
    fn block_size(&self, address: Address) -> Option<Size>;
}

/// Address resolution and mark-bit access used during tracing
pub trait BlockLookup {
    /// Resolve any address, interior or not, to the block containing it
    fn find_containing(&self, address: Address) -> Option<BlockHandle>;

    /// Payload bounds `[start, end)` of a live block
    fn payload_bounds(&self, handle: BlockHandle) -> Option<(Address, Address)>;

    /// Whether the block has been reached in the current cycle
    fn is_marked(&self, handle: BlockHandle) -> bool;

    /// Set the mark bit; returns true only on the first call per cycle
    fn mark(&mut self, handle: BlockHandle) -> bool;
}

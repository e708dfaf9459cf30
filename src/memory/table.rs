/*!
 * Block Table
 * Ownership and address-range lookup for every outstanding block
 *
 * Blocks are keyed by start address in a `BTreeMap`. Ranges never overlap,
 * so the containing block of any address is the last block starting at or
 * below it, found in O(log n).
 */

use super::arena::{Arena, Chunk};
use super::traits::{Allocator, BlockLookup};
use super::types::{
    BlockHandle, HeapBlock, MemoryError, MemoryPressure, MemoryResult, MemoryStats, ReleasedBlock,
};
use crate::core::limits::{DEFAULT_ARENA_CAPACITY, DEFAULT_FREE_LIST_RETAIN};
use crate::core::types::{Address, Size};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::ptr::NonNull;

/// Table entry: metadata plus the memory it describes
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) block: HeapBlock,
    pub(super) chunk: Chunk,
}

/// Process-wide block table
#[derive(Debug)]
pub struct BlockTable {
    pub(super) slots: BTreeMap<Address, Slot>,
    pub(super) arena: Arena,
    pub(super) requested_bytes: Size,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ARENA_CAPACITY)
    }

    /// Create a table over an arena of `capacity` bytes (useful for testing)
    pub fn with_capacity(capacity: Size) -> Self {
        Self::with_arena(Arena::new(capacity, DEFAULT_FREE_LIST_RETAIN))
    }

    pub fn with_arena(arena: Arena) -> Self {
        Self {
            slots: BTreeMap::new(),
            arena,
            requested_bytes: 0,
        }
    }

    /// Allocate a zeroed block of `size` bytes
    pub fn allocate(&mut self, size: Size) -> MemoryResult<BlockHandle> {
        let chunk = self.arena.carve(size)?;
        let address = chunk.address();
        let block = HeapBlock::new(address, size, chunk.capacity());
        let handle = block.handle();

        if let Some(previous) = self.slots.insert(address, Slot { block, chunk }) {
            // The platform allocator never hands out an address that is still owned.
            warn!(
                "Block table already tracked 0x{:x} ({} bytes); replacing stale entry",
                address, previous.block.size
            );
            self.requested_bytes -= previous.block.size;
        }
        self.requested_bytes += size;

        let stats_ratio = self.arena.used() as f64 / self.arena.capacity().max(1) as f64;
        match MemoryPressure::from_ratio(stats_ratio) {
            MemoryPressure::Low => debug!("Allocated {} bytes at 0x{:x}", size, address),
            level => warn!(
                "Memory pressure {}: allocated {} bytes at 0x{:x} ({:.1}% of arena used)",
                level,
                size,
                address,
                stats_ratio * 100.0
            ),
        }

        Ok(handle)
    }

    /// Release the block starting exactly at `address`
    ///
    /// Interior addresses and addresses of already released blocks are
    /// rejected; the table is left untouched in that case.
    pub fn release(&mut self, address: Address) -> MemoryResult<ReleasedBlock> {
        match self.detach(address) {
            Some(released) => {
                debug!(
                    "Released block 0x{:x} ({} bytes requested, {} bytes returned to arena)",
                    address, released.requested, released.capacity
                );
                Ok(released)
            }
            None => {
                warn!(
                    "Attempted to release invalid or already freed address: 0x{:x}",
                    address
                );
                Err(MemoryError::InvalidPointer(address))
            }
        }
    }

    /// Remove a block and hand its chunk back to the arena
    pub(super) fn detach(&mut self, address: Address) -> Option<ReleasedBlock> {
        let slot = self.slots.remove(&address)?;
        Some(self.reclaim(slot))
    }

    pub(super) fn reclaim(&mut self, slot: Slot) -> ReleasedBlock {
        let Slot { block, chunk } = slot;
        let block = block.into_freed();
        debug_assert!(block.freed);
        self.requested_bytes -= block.size;
        self.arena.reclaim(chunk);
        ReleasedBlock {
            requested: block.size,
            capacity: block.capacity,
        }
    }

    /// Find the block whose `[address, address + size)` range contains `address`
    pub fn find_containing(&self, address: Address) -> Option<BlockHandle> {
        self.slots
            .range(..=address)
            .next_back()
            .map(|(_, slot)| &slot.block)
            .filter(|block| block.contains(address))
            .map(HeapBlock::handle)
    }

    /// Metadata of the block a handle refers to
    pub fn get(&self, handle: BlockHandle) -> Option<&HeapBlock> {
        self.slots.get(&handle.address()).map(|slot| &slot.block)
    }

    /// Metadata of the block starting exactly at `address`
    pub fn block_at(&self, address: Address) -> Option<&HeapBlock> {
        self.slots.get(&address).map(|slot| &slot.block)
    }

    /// Pointer to a block's payload, carrying the allocation's provenance
    pub fn payload_ptr(&self, handle: BlockHandle) -> Option<NonNull<u8>> {
        self.slots
            .get(&handle.address())
            .and_then(|slot| NonNull::new(slot.chunk.as_ptr()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live blocks in address order
    pub fn iter(&self) -> impl Iterator<Item = &HeapBlock> + '_ {
        self.slots.values().map(|slot| &slot.block)
    }

    /// Owned copy of every live block, in address order
    pub fn snapshot(&self) -> Vec<HeapBlock> {
        self.iter().cloned().collect()
    }

    pub fn stats(&self) -> MemoryStats {
        let total = self.arena.capacity();
        let used = self.arena.used();
        MemoryStats {
            total_memory: total,
            used_memory: used,
            available_memory: self.arena.available(),
            usage_percentage: if total == 0 {
                100.0
            } else {
                used as f64 / total as f64 * 100.0
            },
            live_blocks: self.slots.len(),
            requested_bytes: self.requested_bytes,
            free_list_chunks: self.arena.free_chunks(),
        }
    }

    /// Return parked chunks to the platform allocator
    pub fn purge_arena(&mut self) -> usize {
        self.arena.purge()
    }

    pub(super) fn log_summary(&self, context: &str) {
        info!(
            "{}: {} live blocks, {} bytes requested, {} / {} arena bytes used",
            context,
            self.slots.len(),
            self.requested_bytes,
            self.arena.used(),
            self.arena.capacity()
        );
    }
}

impl Default for BlockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for BlockTable {
    fn allocate(&mut self, size: Size) -> MemoryResult<BlockHandle> {
        BlockTable::allocate(self, size)
    }

    fn release(&mut self, address: Address) -> MemoryResult<ReleasedBlock> {
        BlockTable::release(self, address)
    }

    fn is_valid(&self, address: Address) -> bool {
        self.slots.contains_key(&address)
    }

    fn block_size(&self, address: Address) -> Option<Size> {
        self.block_at(address).map(|block| block.size)
    }
}

impl BlockLookup for BlockTable {
    fn find_containing(&self, address: Address) -> Option<BlockHandle> {
        BlockTable::find_containing(self, address)
    }

    fn payload_bounds(&self, handle: BlockHandle) -> Option<(Address, Address)> {
        self.get(handle).map(|block| (block.address, block.end()))
    }

    fn is_marked(&self, handle: BlockHandle) -> bool {
        self.get(handle).map_or(false, |block| block.marked)
    }

    fn mark(&mut self, handle: BlockHandle) -> bool {
        match self.slots.get_mut(&handle.address()) {
            Some(slot) if !slot.block.marked => {
                slot.block.marked = true;
                true
            }
            _ => false,
        }
    }
}

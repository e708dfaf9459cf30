/*!
 * Block Table Tests
 * Allocation, exact-start release, containment lookup, and sweeping
 */

use pretty_assertions::assert_eq;
use rgc::memory::{Allocator, BlockLookup, BlockTable, MemoryError, MemoryPressure};

#[test]
fn test_allocate_tracks_requested_and_class_sizes() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let small = table.allocate(10).unwrap();
    let medium = table.allocate(5000).unwrap();

    let small_block = table.get(small).unwrap();
    assert_eq!(small_block.size, 10);
    assert_eq!(small_block.capacity, 16);
    assert!(!small_block.marked);
    assert!(!small_block.freed);

    assert_eq!(table.get(medium).unwrap().capacity, 8192);

    let stats = table.stats();
    assert_eq!(stats.live_blocks, 2);
    assert_eq!(stats.requested_bytes, 5010);
    assert_eq!(stats.used_memory, 16 + 8192);
}

#[test]
fn test_allocations_are_zeroed() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let handle = table.allocate(256).unwrap();
    let ptr = table.payload_ptr(handle).unwrap().as_ptr();
    let bytes = unsafe { std::slice::from_raw_parts(ptr, 256) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn test_out_of_memory_is_clean() {
    let mut table = BlockTable::with_capacity(1024);
    table.allocate(512).unwrap();
    let err = table.allocate(1024).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { requested: 1024, .. }));
    assert_eq!(table.len(), 1);

    // A request within the remaining 512 bytes still fits
    table.allocate(480).unwrap();
    assert_eq!(table.stats().memory_pressure(), MemoryPressure::Critical);
}

#[test]
fn test_zero_sized_allocation_is_rejected() {
    let mut table = BlockTable::with_capacity(1024);
    assert_eq!(table.allocate(0), Err(MemoryError::ZeroSizedAllocation));
    assert!(table.is_empty());
}

#[test]
fn test_release_requires_exact_start() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let handle = table.allocate(64).unwrap();

    let err = table.release(handle.address() + 8).unwrap_err();
    assert_eq!(err, MemoryError::InvalidPointer(handle.address() + 8));
    assert_eq!(table.len(), 1);

    let released = table.release(handle.address()).unwrap();
    assert_eq!(released.requested, 64);
    assert_eq!(released.capacity, 64);
    assert!(table.is_empty());
}

#[test]
fn test_double_release_leaves_table_unchanged() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let a = table.allocate(32).unwrap();
    table.allocate(48).unwrap();
    table.release(a.address()).unwrap();

    let before = table.snapshot();
    let stats_before = table.stats();
    assert_eq!(
        table.release(a.address()),
        Err(MemoryError::InvalidPointer(a.address()))
    );
    assert_eq!(table.snapshot(), before);
    assert_eq!(table.stats(), stats_before);
}

#[test]
fn test_find_containing_interior_and_outside() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let handle = table.allocate(100).unwrap();
    let start = handle.address();

    assert_eq!(table.find_containing(start), Some(handle));
    assert_eq!(table.find_containing(start + 57), Some(handle));
    assert_eq!(table.find_containing(start + 99), Some(handle));
    // Class padding past the requested size is not part of the block
    assert_eq!(table.find_containing(start + 100), None);
    assert_eq!(table.find_containing(0), None);
}

#[test]
fn test_sweep_frees_only_unmarked() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let keep = table.allocate(16).unwrap();
    let drop_a = table.allocate(16).unwrap();
    let drop_b = table.allocate(300).unwrap();

    table.reset_marks();
    assert!(table.mark(keep));
    assert!(!table.mark(keep));

    let outcome = table.sweep();
    assert_eq!(outcome.freed_blocks, 2);
    assert_eq!(outcome.freed_bytes, 16 + 512);
    assert_eq!(outcome.freed_requested, 16 + 300);
    assert!(table.is_valid(keep.address()));
    assert!(!table.is_valid(drop_a.address()));
    assert!(!table.is_valid(drop_b.address()));

    // Survivors keep their mark until the next reset
    assert!(table.is_marked(keep));
    table.reset_marks();
    assert!(!table.is_marked(keep));
}

#[test]
fn test_sweep_on_empty_table() {
    let mut table = BlockTable::with_capacity(1 << 20);
    table.reset_marks();
    let outcome = table.sweep();
    assert_eq!(outcome.freed_blocks, 0);
    assert!(table.is_empty());
}

#[test]
fn test_release_all() {
    let mut table = BlockTable::with_capacity(1 << 20);
    for size in [1, 17, 4097] {
        table.allocate(size).unwrap();
    }
    let outcome = table.release_all();
    assert_eq!(outcome.freed_blocks, 3);
    assert_eq!(outcome.freed_bytes, 16 + 32 + 8192);
    assert!(table.is_empty());
    assert_eq!(table.stats().used_memory, 0);
}

#[test]
fn test_allocator_trait_view() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let allocator: &mut dyn Allocator = &mut table;
    let handle = allocator.allocate(24).unwrap();
    assert!(allocator.is_valid(handle.address()));
    assert_eq!(allocator.block_size(handle.address()), Some(24));
    allocator.release(handle.address()).unwrap();
    assert_eq!(allocator.block_size(handle.address()), None);
}

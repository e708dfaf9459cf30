/*!
 * Explicit Free Tests
 * Manual release alongside collection
 */

use pretty_assertions::assert_eq;
use rgc::{Collector, GcConfig, GcError, MemoryError};

const WORD: usize = std::mem::size_of::<usize>();

fn collector() -> Collector {
    Collector::init(GcConfig::explicit_roots().with_arena_capacity(1 << 20)).unwrap()
}

#[test]
fn test_freed_block_is_not_scanned_or_freed_again() {
    let mut gc = collector();
    let holder = gc.allocate(WORD).unwrap();
    let victim = gc.allocate(WORD).unwrap();
    let victim_child = gc.allocate(WORD).unwrap();

    let holder_ptr = gc.payload_ptr(holder).unwrap().as_ptr().cast::<usize>();
    let victim_ptr = gc.payload_ptr(victim).unwrap().as_ptr().cast::<usize>();
    unsafe {
        holder_ptr.write(victim.address());
        victim_ptr.write(victim_child.address());
    }

    gc.release(victim.address()).unwrap();

    // Stale pointers to the victim remain in the root and in the holder
    let roots = [holder.address(), victim.address()];
    let start = roots.as_ptr() as usize;
    let report = unsafe { gc.collect_explicit(start, start + 2 * WORD, 0, 0) }.unwrap();

    // The victim's payload was never traced, so its child is unreachable
    assert_eq!(report.freed_blocks, 1);
    assert_eq!(report.marked_blocks, 1);
    assert!(gc.table().block_at(victim_child.address()).is_none());
    assert!(gc.table().block_at(holder.address()).is_some());
    assert_eq!(gc.stats().explicit_frees, 1);
}

#[test]
fn test_second_free_reports_invalid_pointer() {
    let mut gc = collector();
    let a = gc.allocate(64).unwrap();
    let b = gc.allocate(64).unwrap();

    gc.release(a.address()).unwrap();
    let blocks_after_first = gc.blocks();
    let memory_after_first = gc.memory_stats();

    let err = gc.release(a.address()).unwrap_err();
    assert_eq!(err, GcError::Memory(MemoryError::InvalidPointer(a.address())));
    assert_eq!(err.error_code(), 2);
    assert_eq!(gc.blocks(), blocks_after_first);
    assert_eq!(gc.memory_stats(), memory_after_first);
    assert!(gc.table().block_at(b.address()).is_some());
}

#[test]
fn test_interior_free_is_rejected() {
    let mut gc = collector();
    let block = gc.allocate(64).unwrap();
    let err = gc.release(block.address() + 8).unwrap_err();
    assert!(matches!(err, GcError::Memory(MemoryError::InvalidPointer(_))));
    assert_eq!(gc.live_blocks(), 1);
}

#[test]
fn test_swept_block_cannot_be_freed() {
    let mut gc = collector();
    let block = gc.allocate(32).unwrap();
    let roots = [0usize];
    let start = roots.as_ptr() as usize;
    let report = unsafe { gc.collect_explicit(start, start + WORD, 0, 0) }.unwrap();
    assert_eq!(report.freed_blocks, 1);

    assert!(gc.release(block.address()).is_err());
    assert_eq!(gc.stats().rejected_frees, 1);
}

#[test]
fn test_cleanup_ignores_reachability() {
    let mut gc = collector();
    let a = gc.allocate(16).unwrap();
    let b = gc.allocate(16).unwrap();
    let ptr = gc.payload_ptr(a).unwrap().as_ptr().cast::<usize>();
    unsafe { ptr.write(b.address()) };

    let report = gc.cleanup();
    assert_eq!(report.released_blocks, 2);
    assert_eq!(report.released_bytes, 32);
}

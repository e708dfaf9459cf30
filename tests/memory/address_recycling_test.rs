/*!
 * Address Recycling Test
 * Released chunks are handed out again for the same size class
 */

use pretty_assertions::assert_eq;
use rgc::memory::{Arena, BlockTable};

#[test]
fn test_address_recycling() {
    let mut table = BlockTable::with_capacity(1 << 20);

    let addr1 = table.allocate(1024).unwrap().address();
    let addr2 = table.allocate(2048).unwrap().address();
    let addr3 = table.allocate(512).unwrap().address();

    table.release(addr2).unwrap();
    assert_eq!(table.stats().free_list_chunks, 1);

    // Same class (2048) reuses the parked chunk
    let addr4 = table.allocate(1500).unwrap().address();
    assert_eq!(addr4, addr2, "freed chunk should be recycled");
    assert_eq!(table.stats().free_list_chunks, 0);

    // A different class does not take the parked 512 byte chunk
    table.release(addr3).unwrap();
    let addr5 = table.allocate(1024).unwrap().address();
    assert_ne!(addr5, addr3);
    assert_ne!(addr5, addr1);
    assert_eq!(table.stats().free_list_chunks, 1);
}

#[test]
fn test_recycled_chunks_are_zeroed() {
    let mut table = BlockTable::with_capacity(1 << 20);
    let first = table.allocate(64).unwrap();
    let ptr = table.payload_ptr(first).unwrap().as_ptr();
    unsafe { std::ptr::write_bytes(ptr, 0xAB, 64) };
    table.release(first.address()).unwrap();

    let second = table.allocate(64).unwrap();
    assert_eq!(second.address(), first.address());
    let ptr = table.payload_ptr(second).unwrap().as_ptr();
    let bytes = unsafe { std::slice::from_raw_parts(ptr, 64) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn test_retain_limit_bounds_parked_bytes() {
    let mut table = BlockTable::with_arena(Arena::new(1 << 20, 128));
    let a = table.allocate(64).unwrap();
    let b = table.allocate(64).unwrap();
    let c = table.allocate(64).unwrap();

    table.release(a.address()).unwrap();
    table.release(b.address()).unwrap();
    table.release(c.address()).unwrap();

    // Only two 64 byte chunks fit under a 128 byte ceiling
    assert_eq!(table.stats().free_list_chunks, 2);
    assert_eq!(table.purge_arena(), 2);
    assert_eq!(table.stats().free_list_chunks, 0);
}

#[test]
fn test_released_capacity_returns_to_arena() {
    let mut table = BlockTable::with_capacity(4096);
    let a = table.allocate(4096).unwrap();
    assert_eq!(table.stats().available_memory, 0);
    table.release(a.address()).unwrap();
    assert_eq!(table.stats().available_memory, 4096);
    table.allocate(4096).unwrap();
}

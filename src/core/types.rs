/*!
 * Core Types
 * Common types used across the collector
 */

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Machine word size in bytes; the scanning granularity
pub const WORD_SIZE: Size = std::mem::size_of::<usize>();

/// Round an address up to the next word boundary
#[inline]
pub const fn align_up(addr: Address) -> Address {
    let rem = addr % WORD_SIZE;
    if rem == 0 {
        addr
    } else {
        addr.saturating_add(WORD_SIZE - rem)
    }
}

/// Round an address down to the previous word boundary
#[inline]
pub const fn align_down(addr: Address) -> Address {
    addr - addr % WORD_SIZE
}

/// Check whether an address sits on a word boundary
#[inline]
pub const fn is_word_aligned(addr: Address) -> bool {
    addr % WORD_SIZE == 0
}

/*!
 * Memory Module
 * Block tracking over a size-class arena
 *
 * ## Allocation
 *
 * - Requests are rounded up to a size class (16B-4KB powers of two,
 *   4KB steps to 64KB, whole pages beyond) and charged against a fixed
 *   arena capacity
 * - Released chunks are parked in a segregated free list and handed out
 *   again, zeroed, for the same class
 *
 * ## Lookup
 *
 * The block table keys blocks by start address, so "which block contains
 * this word?" is a single ordered-map predecessor query.
 */

mod arena;
mod free_list;
mod sweep;
mod table;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use arena::{size_class, Arena};
pub use sweep::SweepOutcome;
pub use table::BlockTable;
pub use traits::*;
pub use types::*;

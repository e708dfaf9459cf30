/*!
 * API Module
 * Process-wide collector handle and the C-callable surface over it
 */

pub mod ffi;
pub mod runtime;

pub use runtime::{
    cleanup, free, garbage_collect, garbage_collect_auto, init, init_with, is_initialized,
    last_error, live_blocks, malloc, stats,
};

/*!
 * C ABI
 * `rgc_*` symbols for hosts linking the cdylib or staticlib
 *
 * These mirror the runtime functions. Failures surface as a null return
 * (`rgc_malloc`) or through `rgc_last_error`; nothing here panics across
 * the boundary.
 */

use super::runtime;
use crate::core::types::Address;
use std::ffi::{c_int, c_void};

/// Create the collector; repeated calls are ignored
#[no_mangle]
pub extern "C" fn rgc_init() {
    let _ = runtime::init();
}

/// Allocate `size` zeroed bytes, or return null
#[no_mangle]
pub extern "C" fn rgc_malloc(size: usize) -> *mut c_void {
    match runtime::malloc(size) {
        Ok(ptr) => ptr.as_ptr().cast(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Release a block previously returned by `rgc_malloc`
#[no_mangle]
pub extern "C" fn rgc_free(ptr: *mut c_void) {
    let _ = runtime::free(ptr as Address);
}

/// Collect with explicit static and stack bounds, each pair in any order
///
/// # Safety
///
/// Both ranges must be readable memory, and the static range must remain
/// readable for later `rgc_garbage_collect_auto` calls.
#[no_mangle]
pub unsafe extern "C" fn rgc_garbage_collect(
    static_start: *const c_void,
    static_end: *const c_void,
    stack_start: *const c_void,
    stack_end: *const c_void,
) {
    let _ = runtime::garbage_collect(
        static_start as Address,
        static_end as Address,
        stack_start as Address,
        stack_end as Address,
    );
}

/// Collect using the known static roots and the calling thread's stack
#[no_mangle]
pub extern "C" fn rgc_garbage_collect_auto() {
    let _ = runtime::garbage_collect_auto();
}

/// Release every outstanding block and the collector itself
#[no_mangle]
pub extern "C" fn rgc_cleanup() {
    let _ = runtime::cleanup();
}

#[no_mangle]
pub extern "C" fn rgc_last_error() -> c_int {
    runtime::last_error()
}

#[no_mangle]
pub extern "C" fn rgc_live_blocks() -> usize {
    runtime::live_blocks()
}

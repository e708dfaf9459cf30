/*!
 * C ABI Tests
 * The `rgc_*` symbols as a C host would call them
 */

use pretty_assertions::assert_eq;
use rgc::api::ffi::*;
use serial_test::serial;
use std::ffi::c_void;
use std::ptr;

#[test]
#[serial]
fn test_malloc_free_round() {
    rgc_cleanup();
    rgc_init();
    rgc_init();

    let block = rgc_malloc(24);
    assert!(!block.is_null());
    assert_eq!(rgc_last_error(), 0);
    assert_eq!(rgc_live_blocks(), 1);

    unsafe { ptr::write_bytes(block.cast::<u8>(), 0x5A, 24) };

    rgc_free(block);
    assert_eq!(rgc_last_error(), 0);
    assert_eq!(rgc_live_blocks(), 0);

    rgc_free(block);
    assert_eq!(rgc_last_error(), 2);

    rgc_free(ptr::null_mut());
    assert_eq!(rgc_last_error(), 0);

    assert!(rgc_malloc(0).is_null());
    assert_eq!(rgc_last_error(), 3);

    rgc_cleanup();
}

#[test]
#[serial]
fn test_use_after_cleanup() {
    rgc_cleanup();
    rgc_init();
    rgc_malloc(16);
    rgc_cleanup();
    assert_eq!(rgc_live_blocks(), 0);

    assert!(rgc_malloc(16).is_null());
    assert_eq!(rgc_last_error(), 10);
    rgc_garbage_collect_auto();
    assert_eq!(rgc_last_error(), 10);
    rgc_cleanup();
    assert_eq!(rgc_last_error(), 10);
}

static mut HOST_GLOBAL: *mut c_void = ptr::null_mut();

#[test]
#[serial]
fn test_explicit_collection_through_c_surface() {
    rgc_cleanup();
    rgc_init();

    let kept = rgc_malloc(32);
    rgc_malloc(32);
    unsafe {
        HOST_GLOBAL = kept;
        let start = ptr::addr_of!(HOST_GLOBAL) as *const c_void;
        let end = start.cast::<u8>().add(std::mem::size_of::<*mut c_void>()) as *const c_void;
        rgc_garbage_collect(start, end, ptr::null(), ptr::null());
    }
    assert_eq!(rgc_last_error(), 0);
    assert_eq!(rgc_live_blocks(), 1);

    unsafe { HOST_GLOBAL = ptr::null_mut() };
    rgc_cleanup();
    assert_eq!(rgc_live_blocks(), 0);
}

/*!
 * Runtime Tests
 * Lifecycle rules and last-error reporting of the process-wide collector
 */

use pretty_assertions::assert_eq;
use rgc::api;
use rgc::{GcConfig, GcError, MemoryError, RGC_OK};
use serial_test::serial;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};

const WORD: usize = std::mem::size_of::<usize>();

fn fresh_runtime() {
    let _ = api::cleanup();
    api::init_with(GcConfig::explicit_roots().with_arena_capacity(1 << 20)).unwrap();
}

#[test]
#[serial]
fn test_calls_before_init_are_rejected() {
    let _ = api::cleanup();
    assert!(!api::is_initialized());

    assert_eq!(api::malloc(16).unwrap_err(), GcError::Uninitialized);
    assert_eq!(api::last_error(), GcError::Uninitialized.error_code());
    assert_eq!(api::free(0x1000), Err(GcError::Uninitialized));
    assert!(matches!(api::garbage_collect_auto(), Err(GcError::Uninitialized)));
    assert_eq!(api::cleanup(), Err(GcError::Uninitialized));
    assert_eq!(api::live_blocks(), 0);
}

#[test]
#[serial]
fn test_repeated_init_keeps_existing_state() {
    fresh_runtime();
    api::malloc(32).unwrap();
    api::init_with(GcConfig::default()).unwrap();
    assert_eq!(api::live_blocks(), 1);
    assert_eq!(api::last_error(), RGC_OK);
    api::cleanup().unwrap();
}

#[test]
#[serial]
fn test_last_error_tracks_latest_call() {
    fresh_runtime();
    assert!(api::malloc(0).is_err());
    assert_eq!(api::last_error(), MemoryError::ZeroSizedAllocation.error_code());

    let ptr = api::malloc(8).unwrap();
    assert_eq!(api::last_error(), RGC_OK);

    api::free(ptr.as_ptr() as usize).unwrap();
    assert_eq!(
        api::free(ptr.as_ptr() as usize),
        Err(GcError::Memory(MemoryError::InvalidPointer(ptr.as_ptr() as usize)))
    );
    assert_eq!(api::last_error(), 2);

    api::free(0).unwrap();
    assert_eq!(api::last_error(), RGC_OK);
    assert_eq!(api::stats().unwrap().rejected_frees, 1);
    api::cleanup().unwrap();
}

#[test]
#[serial]
fn test_out_of_memory_returns_error() {
    fresh_runtime();
    let err = api::malloc(2 << 20).unwrap_err();
    assert!(matches!(err, GcError::Memory(MemoryError::OutOfMemory { .. })));
    assert_eq!(api::last_error(), 1);
    api::cleanup().unwrap();
}

static GLOBAL_ROOT: AtomicUsize = AtomicUsize::new(0);

#[test]
#[serial]
fn test_explicit_then_auto_collection() {
    fresh_runtime();
    let kept = api::malloc(64).unwrap();
    black_box(&GLOBAL_ROOT).store(kept.as_ptr() as usize, Ordering::SeqCst);
    api::malloc(64).unwrap();

    let start = black_box(&GLOBAL_ROOT) as *const AtomicUsize as usize;
    let report = unsafe { api::garbage_collect(start, start + WORD, 0, 0) }.unwrap();
    assert_eq!(report.freed_blocks, 1);
    assert_eq!(api::live_blocks(), 1);

    // The static pair is remembered for the self-discovering form
    let report = api::garbage_collect_auto().unwrap();
    assert_eq!(report.freed_blocks, 0);
    assert_eq!(api::live_blocks(), 1);

    GLOBAL_ROOT.store(0, Ordering::SeqCst);
    let report = unsafe { api::garbage_collect(start, start + WORD, 0, 0) }.unwrap();
    assert_eq!(report.freed_blocks, 1);
    api::cleanup().unwrap();
}

#[test]
#[serial]
fn test_invalid_explicit_bounds() {
    fresh_runtime();
    let err = unsafe { api::garbage_collect(0x1000, 0, 0, 0) }.unwrap_err();
    assert!(matches!(err, GcError::InvalidRootRange { .. }));
    assert_eq!(api::last_error(), 13);
    api::cleanup().unwrap();
}

#[test]
#[serial]
fn test_skipped_stack_is_reported() {
    let _ = api::cleanup();
    api::init_with(
        GcConfig::explicit_roots()
            .with_arena_capacity(1 << 20)
            .with_stack_source(rgc::StackSource::ProcStat),
    )
    .unwrap();

    // /proc/self/stat only describes the main thread's stack
    let (report, code) = std::thread::spawn(|| {
        let report = api::garbage_collect_auto().unwrap();
        (report, api::last_error())
    })
    .join()
    .unwrap();
    assert!(matches!(report.stack_root, rgc::StackRootStatus::Skipped { .. }));
    assert_eq!(code, 11);
    assert_eq!(api::last_error(), 11);
    api::cleanup().unwrap();
}

#[test]
#[serial]
fn test_cleanup_releases_everything() {
    fresh_runtime();
    for size in [8, 24, 100] {
        api::malloc(size).unwrap();
    }
    let report = api::cleanup().unwrap();
    assert_eq!(report.released_blocks, 3);
    assert!(!api::is_initialized());
    assert_eq!(api::malloc(8).unwrap_err(), GcError::Uninitialized);
}

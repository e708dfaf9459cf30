/*!
 * Runtime
 * The one collector a C host talks to
 *
 * C callers cannot hold a `Collector`, so one lives behind a process-wide
 * lock from `init` until `cleanup`. Every call made while none exists fails
 * with `GcError::Uninitialized`. Each call also records its outcome for
 * `last_error`, which keeps failures of `void` C functions observable.
 */

use crate::core::errors::{GcError, GcResult, RGC_OK};
use crate::core::types::Address;
use crate::gc::{CleanupReport, Collector, CycleReport, GcConfig, GcStats, StackRootStatus};
use crate::memory::MemoryError;
use parking_lot::{const_mutex, Mutex};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{error, info, warn};

static RUNTIME: Mutex<Option<Collector>> = const_mutex(None);
static LAST_ERROR: AtomicI32 = AtomicI32::new(RGC_OK);

/// Create the process-wide collector from `RGC_*` environment settings
///
/// A second call while a collector exists changes nothing.
pub fn init() -> GcResult<()> {
    let config = record(GcConfig::from_env())?;
    init_with(config)
}

/// Create the process-wide collector from an explicit configuration
pub fn init_with(config: GcConfig) -> GcResult<()> {
    let mut runtime = RUNTIME.lock();
    if runtime.is_some() {
        warn!("collector already initialized, ignoring repeated init");
        return record(Ok(()));
    }
    let collector = record(Collector::init(config))?;
    *runtime = Some(collector);
    Ok(())
}

/// Allocate `size` zeroed bytes
pub fn malloc(size: usize) -> GcResult<NonNull<u8>> {
    record(with_collector(|gc| {
        let handle = gc.allocate(size)?;
        gc.payload_ptr(handle)
            .ok_or(GcError::Memory(MemoryError::InvalidPointer(handle.address())))
    }))
}

/// Release the block starting exactly at `address`; null is a no-op
pub fn free(address: Address) -> GcResult<()> {
    record(with_collector(|gc| {
        if address != 0 {
            gc.release(address)?;
        }
        Ok(())
    }))
}

/// Run a cycle over host-supplied static and stack bounds
///
/// # Safety
///
/// See [`Collector::collect_explicit`].
pub unsafe fn garbage_collect(
    static_start: Address,
    static_end: Address,
    stack_start: Address,
    stack_end: Address,
) -> GcResult<CycleReport> {
    record(with_collector(|gc| unsafe {
        gc.collect_explicit(static_start, static_end, stack_start, stack_end)
    }))
}

/// Run a cycle over the known static roots and the discovered stack
///
/// A skipped stack root still completes the cycle, but is reported through
/// `last_error` as a stack introspection failure.
pub fn garbage_collect_auto() -> GcResult<CycleReport> {
    let report = record(with_collector(Collector::collect))?;
    if let StackRootStatus::Skipped { reason } = &report.stack_root {
        LAST_ERROR.store(GcError::StackIntrospection(reason.clone()).error_code(), Ordering::Relaxed);
    }
    Ok(report)
}

/// Tear the collector down, releasing every outstanding block
pub fn cleanup() -> GcResult<CleanupReport> {
    let collector = RUNTIME.lock().take();
    let report = record(collector.ok_or(GcError::Uninitialized))?.cleanup();
    info!(released_blocks = report.released_blocks, "runtime cleaned up");
    Ok(report)
}

pub fn is_initialized() -> bool {
    RUNTIME.lock().is_some()
}

/// Live block count, zero when no collector exists
pub fn live_blocks() -> usize {
    RUNTIME.lock().as_ref().map_or(0, Collector::live_blocks)
}

pub fn stats() -> GcResult<GcStats> {
    record(with_collector(|gc| Ok(gc.stats().clone())))
}

/// Code of the most recent failed call, `RGC_OK` after a successful one
pub fn last_error() -> i32 {
    LAST_ERROR.load(Ordering::Relaxed)
}

fn with_collector<R>(f: impl FnOnce(&mut Collector) -> GcResult<R>) -> GcResult<R> {
    let mut runtime = RUNTIME.lock();
    let collector = runtime.as_mut().ok_or(GcError::Uninitialized)?;
    f(collector)
}

fn record<T>(result: GcResult<T>) -> GcResult<T> {
    match &result {
        Ok(_) => LAST_ERROR.store(RGC_OK, Ordering::Relaxed),
        Err(err) => {
            error!(code = err.error_code(), error = %err, "collector call rejected");
            LAST_ERROR.store(err.error_code(), Ordering::Relaxed);
        }
    }
    result
}

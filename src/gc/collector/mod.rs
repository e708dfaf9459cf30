/*!
 * Collector
 * Owned collector context: block table, root locator, and lifetime totals
 *
 * A `Collector` exists from `init` until `cleanup`. Every operation takes it
 * by reference, so using a collector that was never created or already torn
 * down is impossible from Rust. The C surface keeps one behind a lock.
 */

mod cycle;
mod diagnostics;

pub use cycle::CycleState;

use super::config::GcConfig;
use super::roots::{RootKind, RootLocator, RootRange};
use super::stats::{CleanupReport, GcStats};
use crate::core::errors::GcResult;
use crate::core::types::{Address, Size};
use crate::memory::{Arena, BlockHandle, BlockTable, MemoryStats, ReleasedBlock};
use std::ptr::NonNull;
use tracing::{info, warn};

/// Conservative mark-sweep collector
#[derive(Debug)]
pub struct Collector {
    config: GcConfig,
    table: BlockTable,
    locator: RootLocator,
    state: CycleState,
    stats: GcStats,
}

impl Collector {
    /// Create the block table and arena and resolve the static roots
    ///
    /// A failed static-root discovery is logged and leaves the collector
    /// without static roots; the host can still pass them per cycle.
    pub fn init(config: GcConfig) -> GcResult<Self> {
        config.validate()?;

        let mut locator = RootLocator::new(config.stack_source, config.max_stack_scan_bytes);
        match config.static_roots.resolve() {
            Ok(ranges) => {
                for range in ranges {
                    locator.add_static_region(range);
                }
            }
            Err(err) => warn!(error = %err, "static root discovery failed, continuing without static roots"),
        }

        let table = BlockTable::with_arena(Arena::new(
            config.arena_capacity,
            config.free_list_retain_bytes,
        ));

        info!(
            arena_capacity = config.arena_capacity,
            static_ranges = locator.static_regions().len(),
            stack_source = ?config.stack_source,
            "collector initialized"
        );

        Ok(Self {
            config,
            table,
            locator,
            state: CycleState::Idle,
            stats: GcStats::default(),
        })
    }

    pub fn with_defaults() -> GcResult<Self> {
        Self::init(GcConfig::default())
    }

    /// Allocate a zeroed block of `size` bytes
    pub fn allocate(&mut self, size: Size) -> GcResult<BlockHandle> {
        Ok(self.table.allocate(size)?)
    }

    /// Release the block starting exactly at `address`
    ///
    /// Interior, unknown, and already released addresses are rejected and
    /// leave the table untouched.
    pub fn release(&mut self, address: Address) -> GcResult<ReleasedBlock> {
        let result = self.table.release(address);
        self.stats.record_free(result.is_ok());
        Ok(result?)
    }

    /// Pointer to a live block's payload
    pub fn payload_ptr(&self, handle: BlockHandle) -> Option<NonNull<u8>> {
        self.table.payload_ptr(handle)
    }

    pub fn find_containing(&self, address: Address) -> Option<BlockHandle> {
        self.table.find_containing(address)
    }

    pub fn live_blocks(&self) -> usize {
        self.table.len()
    }

    pub fn table(&self) -> &BlockTable {
        &self.table
    }

    pub fn locator(&self) -> &RootLocator {
        &self.locator
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Totals across every cycle and explicit free so far
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.table.stats()
    }

    /// Replace the known static roots with `[start, end)`
    ///
    /// # Safety
    ///
    /// The range must stay readable for as long as this collector runs
    /// cycles, since self-discovering cycles scan it without further checks.
    pub unsafe fn set_static_region(&mut self, start: Address, end: Address) -> GcResult<()> {
        let range = RootRange::checked(start, end, RootKind::Static)?;
        self.locator.set_static_region(range);
        Ok(())
    }

    /// Forget every known static root
    pub fn clear_static_regions(&mut self) {
        self.locator.clear_static_regions();
    }

    /// Release every block unconditionally and return cached memory
    pub fn cleanup(mut self) -> CleanupReport {
        self.teardown()
    }

    fn teardown(&mut self) -> CleanupReport {
        let released = self.table.release_all();
        let purged_chunks = self.table.purge_arena();
        let report = CleanupReport {
            released_blocks: released.freed_blocks,
            released_bytes: released.freed_bytes,
            purged_chunks,
        };
        info!(
            released_blocks = report.released_blocks,
            released_bytes = report.released_bytes,
            purged_chunks = report.purged_chunks,
            "collector cleaned up"
        );
        report
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if !self.table.is_empty() {
            self.teardown();
        }
    }
}

/*!
 * Collection Statistics
 * Per-cycle reports and lifetime totals
 */

use super::roots::StackRootStatus;
use super::scanner::ScanStats;
use crate::core::serde::{is_none, is_zero_u64, is_zero_usize};
use crate::core::types::Size;
use crate::memory::SweepOutcome;
use serde::{Deserialize, Serialize};

/// Outcome of one collection cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub freed_blocks: usize,
    /// Capacity returned to the arena
    pub freed_bytes: Size,
    pub marked_blocks: usize,
    /// Blocks still in the table after the sweep
    pub live_blocks: usize,
    pub words_scanned: usize,
    pub root_ranges: usize,
    pub stack_root: StackRootStatus,
    pub duration_us: u64,
    /// Set when the cycle was abandoned before sweeping
    #[serde(default, skip_serializing_if = "is_none")]
    pub aborted: Option<String>,
}

impl CycleReport {
    pub(crate) fn completed(
        scan: ScanStats,
        sweep: SweepOutcome,
        live_blocks: usize,
        stack_root: StackRootStatus,
        duration_us: u64,
    ) -> Self {
        Self {
            freed_blocks: sweep.freed_blocks,
            freed_bytes: sweep.freed_bytes,
            marked_blocks: scan.blocks_marked,
            live_blocks,
            words_scanned: scan.words_scanned,
            root_ranges: scan.ranges_scanned,
            stack_root,
            duration_us,
            aborted: None,
        }
    }

    pub(crate) fn aborted(live_blocks: usize, stack_root: StackRootStatus, reason: String) -> Self {
        Self {
            freed_blocks: 0,
            freed_bytes: 0,
            marked_blocks: 0,
            live_blocks,
            words_scanned: 0,
            root_ranges: 0,
            stack_root,
            duration_us: 0,
            aborted: Some(reason),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Totals across every cycle run by a collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    pub cycles: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub aborted_cycles: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub stack_scans_skipped: u64,
    pub total_freed_blocks: u64,
    pub total_freed_bytes: u64,
    pub explicit_frees: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub rejected_frees: u64,
    pub total_duration_us: u64,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub last_freed_blocks: usize,
}

impl GcStats {
    pub(crate) fn record_cycle(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.is_aborted() {
            self.aborted_cycles += 1;
        }
        if matches!(report.stack_root, StackRootStatus::Skipped { .. }) {
            self.stack_scans_skipped += 1;
        }
        self.total_freed_blocks += report.freed_blocks as u64;
        self.total_freed_bytes += report.freed_bytes as u64;
        self.total_duration_us += report.duration_us;
        self.last_freed_blocks = report.freed_blocks;
    }

    pub(crate) fn record_free(&mut self, accepted: bool) {
        if accepted {
            self.explicit_frees += 1;
        } else {
            self.rejected_frees += 1;
        }
    }

    pub fn average_cycle_us(&self) -> u64 {
        if self.cycles == 0 {
            0
        } else {
            self.total_duration_us / self.cycles
        }
    }
}

/// Result of tearing a collector down
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub released_blocks: usize,
    pub released_bytes: Size,
    /// Free-list chunks handed back to the platform allocator
    pub purged_chunks: usize,
}

/*!
 * Block Table Sweeping
 * Mark reset, reclamation of unmarked blocks, and full teardown
 */

use super::table::BlockTable;
use crate::core::types::Size;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a sweep (or teardown) gave back to the arena
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub freed_blocks: usize,
    /// Arena bytes returned (size classes)
    pub freed_bytes: Size,
    /// Bytes the callers had asked for
    pub freed_requested: Size,
}

impl BlockTable {
    /// Clear every mark bit; the first step of a cycle
    pub fn reset_marks(&mut self) {
        for slot in self.slots.values_mut() {
            slot.block.marked = false;
        }
    }

    /// Release every unmarked block
    ///
    /// Marked blocks survive with their mark bit still set; the next cycle's
    /// `reset_marks` clears it.
    pub fn sweep(&mut self) -> SweepOutcome {
        let (survivors, garbage): (BTreeMap<_, _>, Vec<_>) = {
            let mut survivors = BTreeMap::new();
            let mut garbage = Vec::new();
            for (address, slot) in std::mem::take(&mut self.slots) {
                if slot.block.marked {
                    survivors.insert(address, slot);
                } else {
                    garbage.push(slot);
                }
            }
            (survivors, garbage)
        };
        self.slots = survivors;

        let mut outcome = SweepOutcome::default();
        for slot in garbage {
            let address = slot.block.address;
            let released = self.reclaim(slot);
            outcome.freed_blocks += 1;
            outcome.freed_bytes += released.capacity;
            outcome.freed_requested += released.requested;
            debug!(
                "Heap object #{} at 0x{:x} unreachable, reclaimed {} bytes",
                outcome.freed_blocks, address, released.capacity
            );
        }
        outcome
    }

    /// Release every block regardless of marks
    pub fn release_all(&mut self) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        for (_, slot) in std::mem::take(&mut self.slots) {
            let released = self.reclaim(slot);
            outcome.freed_blocks += 1;
            outcome.freed_bytes += released.capacity;
            outcome.freed_requested += released.requested;
        }
        if outcome.freed_blocks > 0 {
            info!(
                "Released all {} outstanding blocks ({} bytes)",
                outcome.freed_blocks, outcome.freed_bytes
            );
        }
        self.log_summary("Block table after teardown");
        outcome
    }
}

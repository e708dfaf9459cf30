/*!
 * Collector Diagnostics
 * Block listings and heap graphs; none of these touch mark bits
 */

use super::Collector;
use crate::core::errors::GcResult;
use crate::gc::graph::HeapGraph;
use crate::gc::roots::{with_stack_snapshot, RootSet};
use crate::memory::HeapBlock;
use tracing::info;

impl Collector {
    /// Log every live block as `#n - address | size requested | capacity`
    pub fn inspect(&self) {
        info!(live_blocks = self.table.len(), "inspecting heap");
        for (index, block) in self.table.iter().enumerate() {
            info!(
                "#{} - 0x{:x} | {} bytes requested | {} bytes capacity",
                index + 1,
                block.address,
                block.size,
                block.capacity
            );
        }
    }

    /// Copy of every live block, in address order
    pub fn blocks(&self) -> Vec<HeapBlock> {
        self.table.snapshot()
    }

    /// Heap-to-heap references of every live block
    pub fn heap_graph(&self) -> HeapGraph {
        HeapGraph::from_table(&self.table)
    }

    /// Heap graph with nodes referenced from the known static roots or the
    /// live stack flagged as rooted
    pub fn rooted_heap_graph(&self) -> GcResult<HeapGraph> {
        with_stack_snapshot(|snapshot| {
            let mut roots = RootSet::new();
            roots.extend(self.locator.static_regions().iter().copied());
            roots.push(self.locator.stack_region(snapshot)?);
            // SAFETY: same root ranges a self-discovering cycle would scan
            Ok(unsafe { HeapGraph::with_roots(&self.table, &roots) })
        })
    }
}

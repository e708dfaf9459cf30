/*!
 * Heap Graph
 * Block-to-block reference snapshot for diagnostics
 *
 * Built by reading payload words the same way the scanner does, but
 * without touching mark bits, so it can be taken between cycles.
 */

use super::roots::RootSet;
use super::scanner::MemoryView;
use crate::core::serde::{hex_address, hex_address_vec, is_false};
use crate::core::types::{Address, Size};
use crate::memory::BlockTable;
use ahash::{AHashMap, AHashSet};
use log::info;
use serde::{Deserialize, Serialize};

/// One live block and the blocks its payload points into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapNode {
    #[serde(with = "hex_address")]
    pub address: Address,
    pub size: Size,
    /// Start addresses of referenced blocks, ascending, self excluded
    #[serde(with = "hex_address_vec")]
    pub references: Vec<Address>,
    /// Referenced directly from a root range
    #[serde(default, skip_serializing_if = "is_false")]
    pub rooted: bool,
}

/// Adjacency view of the heap, nodes in address order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapGraph {
    pub nodes: Vec<HeapNode>,
}

impl HeapGraph {
    /// Heap-to-heap references only
    pub fn from_table(table: &BlockTable) -> Self {
        let nodes = table
            .iter()
            .map(|block| {
                let mut references = AHashSet::new();
                // SAFETY: live payloads stay allocated while the table is borrowed
                let view = unsafe { MemoryView::new(block.address, block.end()) };
                for word in view.words() {
                    if let Some(target) = table.find_containing(word) {
                        if target.address() != block.address {
                            references.insert(target.address());
                        }
                    }
                }
                let mut references: Vec<Address> = references.into_iter().collect();
                references.sort_unstable();
                HeapNode {
                    address: block.address,
                    size: block.size,
                    references,
                    rooted: false,
                }
            })
            .collect();
        Self { nodes }
    }

    /// Heap graph with the blocks referenced straight from `roots` flagged
    ///
    /// # Safety
    ///
    /// Every range in `roots` must be readable for the duration of the call.
    pub unsafe fn with_roots(table: &BlockTable, roots: &RootSet) -> Self {
        let mut graph = Self::from_table(table);
        let mut rooted = AHashSet::new();
        for range in roots.ranges() {
            for word in MemoryView::of_range(range).words() {
                if let Some(target) = table.find_containing(word) {
                    rooted.insert(target.address());
                }
            }
        }
        for node in &mut graph.nodes {
            node.rooted = rooted.contains(&node.address);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, address: Address) -> Option<&HeapNode> {
        self.nodes
            .binary_search_by_key(&address, |node| node.address)
            .ok()
            .map(|index| &self.nodes[index])
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.references.len()).sum()
    }

    /// Blocks reachable from the rooted nodes
    pub fn reachable(&self) -> AHashSet<Address> {
        let index: AHashMap<Address, &HeapNode> =
            self.nodes.iter().map(|node| (node.address, node)).collect();
        let mut seen = AHashSet::new();
        let mut pending: Vec<Address> = self
            .nodes
            .iter()
            .filter(|node| node.rooted)
            .map(|node| node.address)
            .collect();

        while let Some(address) = pending.pop() {
            if !seen.insert(address) {
                continue;
            }
            if let Some(node) = index.get(&address) {
                pending.extend(node.references.iter().copied());
            }
        }
        seen
    }

    /// Log one line per node, `R` for rooted and `H` for heap-only
    pub fn log(&self, context: &str) {
        info!("Heap graph {} ({} blocks, {} edges)", context, self.len(), self.edge_count());
        for node in &self.nodes {
            let targets: Vec<String> = node
                .references
                .iter()
                .map(|address| format!("0x{:x}", address))
                .collect();
            info!(
                "{} 0x{:x} contains {} heap reference(s): {}",
                if node.rooted { "R" } else { "H" },
                node.address,
                node.references.len(),
                targets.join(", ")
            );
        }
    }
}

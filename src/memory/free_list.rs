/*!
 * Segregated Free List
 * Parks released chunks by size class for address recycling
 */

use super::arena::Chunk;
use crate::core::limits::{MEDIUM_BLOCK_MAX, MIN_BLOCK_CLASS, PAGE_GRANULE, SMALL_BLOCK_MAX};
use crate::core::types::Size;
use std::collections::BTreeMap;

const SMALL_BUCKETS: usize =
    (SMALL_BLOCK_MAX.trailing_zeros() - MIN_BLOCK_CLASS.trailing_zeros()) as usize + 1;
const MEDIUM_BUCKETS: usize = (MEDIUM_BLOCK_MAX - SMALL_BLOCK_MAX) / PAGE_GRANULE;

/// Segregated free list keyed by size class
/// - Small classes (16B-4KB, powers of 2): O(1) bucket lookup
/// - Medium classes (8KB-64KB, 4KB steps): O(1) bucket lookup
/// - Large classes (>64KB): O(log n) using BTreeMap
#[derive(Debug)]
pub(crate) struct SegregatedFreeList {
    small_chunks: Vec<Vec<Chunk>>,
    medium_chunks: Vec<Vec<Chunk>>,
    large_chunks: BTreeMap<Size, Vec<Chunk>>,
    retained_bytes: Size,
}

impl SegregatedFreeList {
    pub fn new() -> Self {
        Self {
            small_chunks: (0..SMALL_BUCKETS).map(|_| Vec::new()).collect(),
            medium_chunks: (0..MEDIUM_BUCKETS).map(|_| Vec::new()).collect(),
            large_chunks: BTreeMap::new(),
            retained_bytes: 0,
        }
    }

    fn small_bucket_index(class: Size) -> Option<usize> {
        if class > SMALL_BLOCK_MAX || !class.is_power_of_two() || class < MIN_BLOCK_CLASS {
            return None;
        }
        Some((class.trailing_zeros() - MIN_BLOCK_CLASS.trailing_zeros()) as usize)
    }

    fn medium_bucket_index(class: Size) -> Option<usize> {
        if class <= SMALL_BLOCK_MAX || class > MEDIUM_BLOCK_MAX || class % PAGE_GRANULE != 0 {
            return None;
        }
        // 8KB is the first medium class
        Some(class / PAGE_GRANULE - 2)
    }

    pub fn insert(&mut self, chunk: Chunk) {
        let class = chunk.capacity();
        self.retained_bytes += class;
        if let Some(idx) = Self::small_bucket_index(class) {
            self.small_chunks[idx].push(chunk);
        } else if let Some(idx) = Self::medium_bucket_index(class) {
            self.medium_chunks[idx].push(chunk);
        } else {
            self.large_chunks.entry(class).or_default().push(chunk);
        }
    }

    /// Take a parked chunk of exactly `class` bytes
    pub fn take(&mut self, class: Size) -> Option<Chunk> {
        let chunk = if let Some(idx) = Self::small_bucket_index(class) {
            self.small_chunks[idx].pop()
        } else if let Some(idx) = Self::medium_bucket_index(class) {
            self.medium_chunks[idx].pop()
        } else {
            let chunks = self.large_chunks.get_mut(&class)?;
            let chunk = chunks.pop();
            if chunks.is_empty() {
                self.large_chunks.remove(&class);
            }
            chunk
        }?;
        self.retained_bytes -= chunk.capacity();
        Some(chunk)
    }

    pub fn len(&self) -> usize {
        let small: usize = self.small_chunks.iter().map(Vec::len).sum();
        let medium: usize = self.medium_chunks.iter().map(Vec::len).sum();
        let large: usize = self.large_chunks.values().map(Vec::len).sum();
        small + medium + large
    }

    pub fn retained_bytes(&self) -> Size {
        self.retained_bytes
    }

    /// Drop every parked chunk, returning them to the platform allocator
    pub fn clear(&mut self) -> usize {
        let count = self.len();
        self.small_chunks.iter_mut().for_each(Vec::clear);
        self.medium_chunks.iter_mut().for_each(Vec::clear);
        self.large_chunks.clear();
        self.retained_bytes = 0;
        count
    }
}

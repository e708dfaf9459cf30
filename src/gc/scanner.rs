/*!
 * Conservative Scanner
 * Word-by-word reachability tracing over untyped memory
 *
 * Every word of a root range is treated as a candidate address. Words that
 * land inside a live block mark it, and the block's own payload is queued
 * to be scanned the same way. A block is queued only on the transition from
 * unmarked to marked, which bounds the work by the heap size and makes
 * cycles and self-references terminate.
 *
 * `MemoryView` is the only place raw memory is read. Everything else deals
 * in `BlockHandle`s.
 */

use super::roots::RootRange;
use crate::core::types::{align_down, align_up, Address, WORD_SIZE};
use crate::memory::{BlockHandle, BlockLookup};
use serde::{Deserialize, Serialize};

/// Read-only, word-granular view over memory the creator vouches for
#[derive(Debug, Clone, Copy)]
pub struct MemoryView {
    start: Address,
    end: Address,
}

impl MemoryView {
    /// View `[start, end)` shrunk to whole words
    ///
    /// # Safety
    ///
    /// Every byte of `[start, end)` must be mapped and readable for as long
    /// as the view (or any iterator from it) is used.
    pub unsafe fn new(start: Address, end: Address) -> Self {
        let start = align_up(start);
        let end = align_down(end).max(start);
        Self { start, end }
    }

    /// # Safety
    ///
    /// Same contract as [`MemoryView::new`] for the range's bounds.
    pub unsafe fn of_range(range: &RootRange) -> Self {
        let aligned = range.word_aligned();
        Self::new(aligned.start(), aligned.end())
    }

    pub fn len_words(&self) -> usize {
        (self.end - self.start) / WORD_SIZE
    }

    /// Word values in address order; the trailing partial word is skipped
    pub fn words(&self) -> Words {
        Words {
            cursor: self.start,
            end: self.end,
        }
    }
}

/// Iterator over the words of a [`MemoryView`]
#[derive(Debug)]
pub struct Words {
    cursor: Address,
    end: Address,
}

impl Iterator for Words {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.cursor + WORD_SIZE > self.end {
            return None;
        }
        // SAFETY: the view's creator guaranteed readability and the cursor
        // is word aligned and in bounds. Volatile so the read is not elided
        // or assumed to alias nothing.
        let word = unsafe { std::ptr::read_volatile(self.cursor as *const usize) };
        self.cursor += WORD_SIZE;
        Some(word)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.cursor) / WORD_SIZE;
        (remaining, Some(remaining))
    }
}

/// Counters for one tracing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub ranges_scanned: usize,
    pub words_scanned: usize,
    /// Words that resolved to a live block
    pub candidates: usize,
    pub blocks_marked: usize,
}

/// Marks every block reachable from the ranges it is given
pub struct Scanner<'t, T: BlockLookup + ?Sized> {
    table: &'t mut T,
    worklist: Vec<BlockHandle>,
    stats: ScanStats,
}

impl<'t, T: BlockLookup + ?Sized> Scanner<'t, T> {
    pub fn new(table: &'t mut T) -> Self {
        Self {
            table,
            worklist: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    /// Trace everything reachable from `range`
    ///
    /// # Safety
    ///
    /// `range` must be readable memory for the duration of the call.
    pub unsafe fn scan(&mut self, range: &RootRange) {
        self.stats.ranges_scanned += 1;
        let view = MemoryView::of_range(range);
        self.visit(view);
        self.drain();
    }

    pub fn finish(self) -> ScanStats {
        self.stats
    }

    fn visit(&mut self, view: MemoryView) {
        for word in view.words() {
            self.stats.words_scanned += 1;
            if word == 0 {
                continue;
            }
            if let Some(handle) = self.table.find_containing(word) {
                self.stats.candidates += 1;
                if self.table.mark(handle) {
                    self.stats.blocks_marked += 1;
                    self.worklist.push(handle);
                }
            }
        }
    }

    fn drain(&mut self) {
        while let Some(handle) = self.worklist.pop() {
            if let Some((start, end)) = self.table.payload_bounds(handle) {
                // SAFETY: a live block's payload is owned by the table and
                // stays allocated while the table is borrowed.
                let view = unsafe { MemoryView::new(start, end) };
                self.visit(view);
            }
        }
    }
}

/*!
 * Root Locator
 * Memory ranges treated as roots: static storage plus the live stack
 *
 * Root ranges are rebuilt for every cycle. The stack range in particular
 * moves with every call and is never cached.
 */

pub mod stack;
pub mod statics;

use crate::core::errors::{GcError, GcResult};
use crate::core::serde::hex_address;
use crate::core::types::{align_down, align_up, is_word_aligned, Address, Size, WORD_SIZE};
use serde::{Deserialize, Serialize};

pub use stack::{scrub_stack, with_stack_snapshot, StackBounds, StackSnapshot, StackSource};
pub use statics::StaticRootsSource;

/// Where a root range came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    Static,
    Stack,
    /// Supplied by the embedder outside the two standard sources
    Extra,
}

/// Contiguous memory region scanned conservatively, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootRange {
    #[serde(with = "hex_address")]
    start: Address,
    #[serde(with = "hex_address")]
    end: Address,
    kind: RootKind,
}

impl RootRange {
    /// Build a range from two bounds in either order
    ///
    /// Stacks usually grow toward lower addresses, so hosts often hand over
    /// the bounds reversed; they are normalized here.
    pub fn new(a: Address, b: Address, kind: RootKind) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self { start, end, kind }
    }

    /// Like `new`, but rejects null bounds
    pub fn checked(a: Address, b: Address, kind: RootKind) -> GcResult<Self> {
        if a == 0 || b == 0 {
            return Err(GcError::InvalidRootRange { start: a, end: b });
        }
        Ok(Self::new(a, b, kind))
    }

    /// Range covering a single value in memory
    pub fn of<T>(value: &T, kind: RootKind) -> Self {
        let start = value as *const T as Address;
        Self::new(start, start + std::mem::size_of::<T>(), kind)
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    pub fn len(&self) -> Size {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shrink to whole words: start rounded up, end rounded down
    pub fn word_aligned(&self) -> Self {
        if !is_word_aligned(self.end) {
            log::debug!(
                "Root range end 0x{:x} is not word aligned, evaluating as 0x{:x}",
                self.end,
                align_down(self.end)
            );
        }
        let start = align_up(self.start);
        let end = align_down(self.end).max(start);
        Self {
            start,
            end,
            kind: self.kind,
        }
    }

    /// Number of whole words a scan of this range visits
    pub fn word_count(&self) -> usize {
        let aligned = self.word_aligned();
        aligned.len() / WORD_SIZE
    }

    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end
    }
}

/// Outcome of trying to obtain the stack root for a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StackRootStatus {
    /// Stack range scanned
    Scanned { bytes: Size },
    /// No stack range was requested (explicit bounds omitted it)
    NotRequested,
    /// Introspection failed; the cycle ran on the remaining roots
    Skipped { reason: String },
}

/// Root ranges for a single cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSet {
    ranges: Vec<RootRange>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: RootRange) -> Self {
        self.push(range);
        self
    }

    /// Add a range; empty ranges are ignored
    pub fn push(&mut self, range: RootRange) {
        if !range.is_empty() {
            self.ranges.push(range);
        }
    }

    pub fn extend<I: IntoIterator<Item = RootRange>>(&mut self, ranges: I) {
        for range in ranges {
            self.push(range);
        }
    }

    pub fn ranges(&self) -> &[RootRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn total_bytes(&self) -> Size {
        self.ranges.iter().map(RootRange::len).sum()
    }

    pub fn of_kind(&self, kind: RootKind) -> impl Iterator<Item = &RootRange> + '_ {
        self.ranges.iter().filter(move |r| r.kind() == kind)
    }
}

/// Produces root ranges from configured sources
#[derive(Debug, Clone)]
pub struct RootLocator {
    static_ranges: Vec<RootRange>,
    stack_source: StackSource,
    max_stack_bytes: Size,
}

impl RootLocator {
    pub fn new(stack_source: StackSource, max_stack_bytes: Size) -> Self {
        Self {
            static_ranges: Vec::new(),
            stack_source,
            max_stack_bytes,
        }
    }

    /// Add one static range to the known set
    pub fn add_static_region(&mut self, range: RootRange) {
        if !range.is_empty() {
            self.static_ranges
                .push(RootRange::new(range.start(), range.end(), RootKind::Static));
        }
    }

    /// The known static regions (may be empty)
    pub fn static_regions(&self) -> &[RootRange] {
        &self.static_ranges
    }

    /// Single span from the lowest to the highest known static address
    pub fn static_region(&self) -> Option<RootRange> {
        let start = self.static_ranges.iter().map(RootRange::start).min()?;
        let end = self.static_ranges.iter().map(RootRange::end).max()?;
        Some(RootRange::new(start, end, RootKind::Static))
    }

    /// Replace the known static regions with one host-supplied span
    pub fn set_static_region(&mut self, range: RootRange) {
        self.static_ranges = vec![RootRange::new(range.start(), range.end(), RootKind::Static)];
    }

    pub fn clear_static_regions(&mut self) {
        self.static_ranges.clear();
    }

    pub fn stack_source(&self) -> StackSource {
        self.stack_source
    }

    /// Stack span from the snapshot's stack pointer to the stack's logical end
    pub fn stack_region(&self, snapshot: &StackSnapshot) -> GcResult<RootRange> {
        let bounds = StackBounds::discover(self.stack_source)?;
        let range = bounds.range_from(snapshot.stack_pointer())?;
        if range.len() > self.max_stack_bytes {
            return Err(GcError::StackIntrospection(format!(
                "stack span of {} bytes exceeds the {} byte scan ceiling",
                range.len(),
                self.max_stack_bytes
            )));
        }
        Ok(range)
    }
}

/*!
 * Backing Arena
 * Size-class rounding, capacity accounting, and chunk recycling
 */

use super::free_list::SegregatedFreeList;
use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{MEDIUM_BLOCK_MAX, MIN_BLOCK_CLASS, PAGE_GRANULE, SMALL_BLOCK_MAX};
use crate::core::types::{Address, Size};
use log::{debug, error, info};
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every chunk, matching what C's malloc guarantees
pub(crate) const CHUNK_ALIGN: usize = 16;

/// Round a request up to its size class
///
/// Classes: powers of two from 16 bytes to 4KB, 4KB steps up to 64KB,
/// whole 4KB pages beyond that.
pub fn size_class(size: Size) -> MemoryResult<Size> {
    if size == 0 {
        return Err(MemoryError::ZeroSizedAllocation);
    }
    if size <= SMALL_BLOCK_MAX {
        return Ok(size.next_power_of_two().max(MIN_BLOCK_CLASS));
    }
    let rounded = size
        .checked_add(PAGE_GRANULE - 1)
        .map(|s| s / PAGE_GRANULE * PAGE_GRANULE)
        .ok_or(MemoryError::LayoutOverflow(size))?;
    debug_assert!(rounded > SMALL_BLOCK_MAX);
    debug_assert!(size > MEDIUM_BLOCK_MAX || rounded <= MEDIUM_BLOCK_MAX);
    Ok(rounded)
}

/// A zero-initialized region obtained from the platform allocator
///
/// Owns its memory: dropping a chunk hands it back to the platform.
pub(crate) struct Chunk {
    ptr: NonNull<u8>,
    capacity: Size,
}

// Chunks are plain byte buffers with a single owner.
unsafe impl Send for Chunk {}

impl Chunk {
    pub fn allocate(capacity: Size) -> MemoryResult<Self> {
        let layout = Self::layout_for(capacity)?;
        // SAFETY: layout has non-zero size (capacity >= MIN_BLOCK_CLASS).
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(MemoryError::OutOfMemory {
            requested: capacity,
            available: 0,
            used: 0,
            total: 0,
        })?;
        Ok(Self { ptr, capacity })
    }

    fn layout_for(capacity: Size) -> MemoryResult<Layout> {
        Layout::from_size_align(capacity, CHUNK_ALIGN)
            .map_err(|_| MemoryError::LayoutOverflow(capacity))
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.ptr.as_ptr() as Address
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.capacity
    }

    fn zero(&mut self) {
        // SAFETY: the chunk owns `capacity` writable bytes.
        unsafe { std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.capacity) };
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout_for(self.capacity) {
            // SAFETY: allocated in `Chunk::allocate` with this same layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("address", &format_args!("0x{:x}", self.address()))
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Backing arena for heap blocks
///
/// Charges each block its size class against a fixed capacity and parks
/// released chunks for reuse until `retain_limit` bytes are parked.
#[derive(Debug)]
pub struct Arena {
    capacity: Size,
    used: Size,
    retain_limit: Size,
    free_list: SegregatedFreeList,
}

impl Arena {
    pub fn new(capacity: Size, retain_limit: Size) -> Self {
        info!(
            "Arena initialized with {} bytes capacity, retaining up to {} bytes of released chunks",
            capacity, retain_limit
        );
        Self {
            capacity,
            used: 0,
            retain_limit,
            free_list: SegregatedFreeList::new(),
        }
    }

    /// Carve a zeroed chunk able to hold `size` bytes
    pub(crate) fn carve(&mut self, size: Size) -> MemoryResult<Chunk> {
        let class = size_class(size)?;

        if self.used.saturating_add(class) > self.capacity {
            let available = self.available();
            error!(
                "OOM: requested {} bytes (class {}), only {} bytes available ({} used / {} total)",
                size, class, available, self.used, self.capacity
            );
            return Err(MemoryError::OutOfMemory {
                requested: size,
                available,
                used: self.used,
                total: self.capacity,
            });
        }

        let chunk = match self.free_list.take(class) {
            Some(mut recycled) => {
                recycled.zero();
                debug!(
                    "Recycled chunk 0x{:x} (class {}) for {} byte request",
                    recycled.address(),
                    class,
                    size
                );
                recycled
            }
            None => {
                let (available, used, total) = (self.available(), self.used, self.capacity);
                Chunk::allocate(class).map_err(|err| match err {
                    MemoryError::OutOfMemory { .. } => {
                        error!("Platform allocator refused {} bytes", class);
                        MemoryError::OutOfMemory {
                            requested: size,
                            available,
                            used,
                            total,
                        }
                    }
                    other => other,
                })?
            }
        };

        self.used += class;
        Ok(chunk)
    }

    /// Take a chunk back, parking it for reuse when under the retain limit
    pub(crate) fn reclaim(&mut self, chunk: Chunk) {
        let class = chunk.capacity();
        self.used = self.used.saturating_sub(class);

        if self.free_list.retained_bytes() + class <= self.retain_limit {
            self.free_list.insert(chunk);
        } else {
            debug!(
                "Free list full ({} bytes parked), returning chunk 0x{:x} to the platform",
                self.free_list.retained_bytes(),
                chunk.address()
            );
            drop(chunk);
        }
    }

    /// Return every parked chunk to the platform allocator
    pub fn purge(&mut self) -> usize {
        let count = self.free_list.clear();
        if count > 0 {
            info!("Arena purged {} parked chunks", count);
        }
        count
    }

    pub fn capacity(&self) -> Size {
        self.capacity
    }

    pub fn used(&self) -> Size {
        self.used
    }

    pub fn available(&self) -> Size {
        self.capacity.saturating_sub(self.used)
    }

    pub fn free_chunks(&self) -> usize {
        self.free_list.len()
    }
}

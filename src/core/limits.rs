/*!
 * Collector Limits and Constants
 *
 * Centralized location for arena sizing, size classes, and scan ceilings.
 *
 * ## Conventions
 * - Performance-critical constants are marked with [PERF]
 * - Safety-critical constants are marked with [SAFETY]
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 */

// =============================================================================
// ARENA LIMITS
// =============================================================================

/// Default arena capacity (1GB)
/// Upper bound on bytes charged to outstanding blocks
pub const DEFAULT_ARENA_CAPACITY: usize = 1024 * 1024 * 1024;

/// Smallest size class (16 bytes)
/// Two words: the smallest chunk that can hold a pointer pair
pub const MIN_BLOCK_CLASS: usize = 16;

/// Small block threshold (4KB)
/// Power-of-2 classes up to this size
/// [PERF] Aligned with common page size
pub const SMALL_BLOCK_MAX: usize = 4 * 1024;

/// Medium block threshold (64KB)
/// 4KB-step classes between SMALL_BLOCK_MAX and this size
pub const MEDIUM_BLOCK_MAX: usize = 64 * 1024;

/// Granularity for medium and large classes (4KB)
pub const PAGE_GRANULE: usize = 4 * 1024;

/// Default ceiling on bytes parked in the free list (16MB)
/// [PERF] Recycled chunks skip the platform allocator
pub const DEFAULT_FREE_LIST_RETAIN: usize = 16 * 1024 * 1024;

// =============================================================================
// SCAN LIMITS
// =============================================================================

/// Largest stack span a self-discovered collection will scan (1GB)
/// [SAFETY] A wider span means the stack bounds are bogus
pub const DEFAULT_MAX_STACK_SCAN: usize = 1024 * 1024 * 1024;

/// Field index of `startstack` in /proc/self/stat (1-based)
/// [LINUX-COMPAT] See proc(5)
pub const PROC_STAT_STARTSTACK_FIELD: usize = 28;

/// Cycles slower than this are logged at warn level (100ms)
pub const SLOW_CYCLE_MS: u128 = 100;

// =============================================================================
// MEMORY PRESSURE
// =============================================================================

/// Arena usage ratio reported as medium pressure
pub const PRESSURE_MEDIUM: f64 = 0.60;

/// Arena usage ratio reported as high pressure
pub const PRESSURE_HIGH: f64 = 0.80;

/// Arena usage ratio reported as critical pressure
pub const PRESSURE_CRITICAL: f64 = 0.95;

/*!
 * rgc
 * Conservative mark-sweep collector with a C-callable surface
 */

pub mod api;
pub mod core;
pub mod gc;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::*;
pub use gc::{
    scrub_stack, CleanupReport, Collector, CycleReport, GcConfig, GcStats, HeapGraph, RootKind,
    RootRange, RootSet, StackFailurePolicy, StackRootStatus, StackSource, StaticRootsSource,
};
pub use memory::{BlockHandle, BlockTable, HeapBlock, MemoryError, MemoryPressure, MemoryStats};
pub use monitoring::init_tracing;

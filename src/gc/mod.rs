/*!
 * Garbage Collector
 * Root discovery, conservative tracing, and the mark-sweep cycle
 */

pub mod collector;
pub mod config;
pub mod graph;
pub mod roots;
pub mod scanner;
pub mod stats;

pub use collector::{Collector, CycleState};
pub use config::{GcConfig, StackFailurePolicy};
pub use graph::{HeapGraph, HeapNode};
pub use roots::{
    scrub_stack, RootKind, RootLocator, RootRange, RootSet, StackRootStatus, StackSource,
    StaticRootsSource,
};
pub use scanner::{MemoryView, ScanStats, Scanner};
pub use stats::{CleanupReport, CycleReport, GcStats};

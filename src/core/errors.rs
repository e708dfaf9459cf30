/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export MemoryError from memory module
pub use crate::memory::MemoryError;

/// Code reported to C callers when the last operation succeeded
pub const RGC_OK: i32 = 0;

/// Unified collector error type with miette diagnostics
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum GcError {
    #[error("Memory error: {0}")]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error("Collector used before init() or after cleanup()")]
    #[diagnostic(
        code(gc::uninitialized),
        help("Call init() once before any allocation and do not use the collector after cleanup().")
    )]
    Uninitialized,

    #[error("Stack introspection failed: {0}")]
    #[diagnostic(
        code(gc::stack_introspection),
        help("The stack root range was skipped. Use the explicit-bounds collection entry point or switch the stack source.")
    )]
    StackIntrospection(String),

    #[error("Static region discovery failed: {0}")]
    #[diagnostic(
        code(gc::static_region),
        help("Pass the static region bounds explicitly (for example &etext and &end from the host).")
    )]
    StaticRegion(String),

    #[error("Invalid root range: 0x{start:x}..0x{end:x}")]
    #[diagnostic(
        code(gc::invalid_root_range),
        help("A root range must be non-null on both ends.")
    )]
    InvalidRootRange { start: usize, end: usize },

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(gc::configuration),
        help("Check the RGC_* environment variables. Unset them to fall back to defaults.")
    )]
    Configuration(String),
}

impl GcError {
    /// Stable numeric code exposed through the C surface
    pub fn error_code(&self) -> i32 {
        match self {
            GcError::Memory(err) => err.error_code(),
            GcError::Uninitialized => 10,
            GcError::StackIntrospection(_) => 11,
            GcError::StaticRegion(_) => 12,
            GcError::InvalidRootRange { .. } => 13,
            GcError::Configuration(_) => 14,
        }
    }
}

/// Result type for collector operations
pub type GcResult<T> = std::result::Result<T, GcError>;

/*!
 * Collector Configuration
 *
 * Runtime knobs for arena sizing and root discovery, settable from the
 * environment or through builder methods.
 */

use super::roots::{StackSource, StaticRootsSource};
use crate::core::errors::{GcError, GcResult};
use crate::core::limits::{DEFAULT_ARENA_CAPACITY, DEFAULT_FREE_LIST_RETAIN, DEFAULT_MAX_STACK_SCAN};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_ARENA_CAPACITY: &str = "RGC_ARENA_CAPACITY";
pub const ENV_STACK_SOURCE: &str = "RGC_STACK_SOURCE";
pub const ENV_STATIC_ROOTS: &str = "RGC_STATIC_ROOTS";
pub const ENV_ON_STACK_FAILURE: &str = "RGC_ON_STACK_FAILURE";

/// What a self-discovering cycle does when the stack range is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackFailurePolicy {
    /// Report the failure and continue with the static roots alone
    ScanStaticOnly,
    /// Report the failure and free nothing
    AbortCycle,
}

impl Default for StackFailurePolicy {
    fn default() -> Self {
        StackFailurePolicy::ScanStaticOnly
    }
}

impl FromStr for StackFailurePolicy {
    type Err = GcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan_static_only" | "static" | "skip" => Ok(StackFailurePolicy::ScanStaticOnly),
            "abort_cycle" | "abort" => Ok(StackFailurePolicy::AbortCycle),
            other => Err(GcError::Configuration(format!(
                "unknown stack failure policy '{}', expected scan_static_only or abort_cycle",
                other
            ))),
        }
    }
}

/// Collector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcConfig {
    /// Bytes the arena may charge to outstanding blocks (default: 1GB)
    pub arena_capacity: Size,

    /// Bytes of released chunks kept for reuse (default: 16MB)
    pub free_list_retain_bytes: Size,

    pub stack_source: StackSource,

    pub static_roots: StaticRootsSource,

    pub on_stack_failure: StackFailurePolicy,

    /// Largest stack span a self-discovered cycle will scan (default: 1GB)
    pub max_stack_scan_bytes: Size,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            free_list_retain_bytes: DEFAULT_FREE_LIST_RETAIN,
            stack_source: StackSource::default(),
            static_roots: StaticRootsSource::default(),
            on_stack_failure: StackFailurePolicy::default(),
            max_stack_scan_bytes: DEFAULT_MAX_STACK_SCAN,
        }
    }
}

impl GcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `RGC_*` variables that are set
    pub fn from_env() -> GcResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`
    pub fn from_lookup<F>(lookup: F) -> GcResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ARENA_CAPACITY) {
            config.arena_capacity = parse_bytes(ENV_ARENA_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_STACK_SOURCE) {
            config.stack_source = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_STATIC_ROOTS) {
            config.static_roots = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_ON_STACK_FAILURE) {
            config.on_stack_failure = raw.parse()?;
        }

        Ok(config)
    }

    /// Configuration with no static discovery, for hosts passing bounds per cycle
    pub fn explicit_roots() -> Self {
        Self::default().with_static_roots(StaticRootsSource::None)
    }

    pub fn with_arena_capacity(mut self, capacity: Size) -> Self {
        self.arena_capacity = capacity;
        self
    }

    pub fn with_free_list_retain(mut self, bytes: Size) -> Self {
        self.free_list_retain_bytes = bytes;
        self
    }

    pub fn with_stack_source(mut self, source: StackSource) -> Self {
        self.stack_source = source;
        self
    }

    pub fn with_static_roots(mut self, source: StaticRootsSource) -> Self {
        self.static_roots = source;
        self
    }

    pub fn with_stack_failure_policy(mut self, policy: StackFailurePolicy) -> Self {
        self.on_stack_failure = policy;
        self
    }

    pub fn with_max_stack_scan(mut self, bytes: Size) -> Self {
        self.max_stack_scan_bytes = bytes;
        self
    }

    pub fn validate(&self) -> GcResult<()> {
        if self.arena_capacity == 0 {
            return Err(GcError::Configuration(
                "arena capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_stack_scan_bytes == 0 {
            return Err(GcError::Configuration(
                "stack scan ceiling must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Byte counts with an optional K/M/G suffix (powers of 1024)
fn parse_bytes(key: &str, raw: &str) -> GcResult<Size> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();
    let (digits, multiplier) = match upper.as_bytes().last() {
        Some(b'K') => (&trimmed[..trimmed.len() - 1], 1024),
        Some(b'M') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some(b'G') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };

    digits
        .trim()
        .parse::<Size>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(|| GcError::Configuration(format!("{} has invalid byte count '{}'", key, raw)))
}

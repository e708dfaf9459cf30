/*!
 * Collection Cycle
 * Idle -> Marking -> Sweeping -> Idle, run to completion on the caller
 */

use super::Collector;
use crate::core::errors::GcResult;
use crate::core::limits::SLOW_CYCLE_MS;
use crate::core::types::Address;
use crate::gc::config::StackFailurePolicy;
use crate::gc::roots::{with_stack_snapshot, RootKind, RootRange, RootSet, StackRootStatus, StackSnapshot};
use crate::gc::scanner::Scanner;
use crate::gc::stats::CycleReport;
use crate::monitoring::span_operation;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Phase of the collector; anything but `Idle` is only seen mid-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Marking,
    Sweeping,
}

impl Collector {
    /// Collect using the known static roots and the live stack
    ///
    /// Stack bounds come from the configured source. If they cannot be
    /// determined the failure is reported and, depending on
    /// `on_stack_failure`, the cycle either runs on the static roots alone
    /// (`stack_root` is `Skipped` in the report) or returns the error
    /// without freeing anything.
    pub fn collect(&mut self) -> GcResult<CycleReport> {
        with_stack_snapshot(|snapshot| self.collect_from_snapshot(snapshot))
    }

    /// Collect with host-supplied bounds
    ///
    /// Both pairs may come in either order. A pair of nulls omits that
    /// range; a pair with a single null is rejected. The static pair
    /// becomes the collector's known static region for later cycles.
    ///
    /// # Safety
    ///
    /// Both ranges must be readable while the cycle runs, and the static
    /// range must stay readable for as long as this collector runs cycles.
    pub unsafe fn collect_explicit(
        &mut self,
        static_start: Address,
        static_end: Address,
        stack_start: Address,
        stack_end: Address,
    ) -> GcResult<CycleReport> {
        let static_range = optional_range(static_start, static_end, RootKind::Static)?;
        let stack_range = optional_range(stack_start, stack_end, RootKind::Stack)?;

        if let Some(range) = static_range {
            self.locator.set_static_region(range);
        }

        let mut roots = RootSet::new();
        roots.extend(static_range);
        let stack_root = match stack_range {
            Some(range) => {
                roots.push(range);
                StackRootStatus::Scanned { bytes: range.len() }
            }
            None => StackRootStatus::NotRequested,
        };

        Ok(self.run_cycle(&roots, stack_root))
    }

    /// Collect with an arbitrary set of root ranges
    ///
    /// # Safety
    ///
    /// Every range in `roots` must be readable while the cycle runs.
    pub unsafe fn collect_with_roots(&mut self, roots: &RootSet) -> CycleReport {
        let stack_bytes: usize = roots.of_kind(RootKind::Stack).map(RootRange::len).sum();
        let stack_root = if stack_bytes > 0 {
            StackRootStatus::Scanned { bytes: stack_bytes }
        } else {
            StackRootStatus::NotRequested
        };
        self.run_cycle(roots, stack_root)
    }

    fn collect_from_snapshot(&mut self, snapshot: &StackSnapshot) -> GcResult<CycleReport> {
        let mut roots = RootSet::new();
        roots.extend(self.locator.static_regions().iter().copied());

        let stack_root = match self.locator.stack_region(snapshot) {
            Ok(range) => {
                roots.push(range);
                StackRootStatus::Scanned { bytes: range.len() }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    policy = ?self.config.on_stack_failure,
                    "stack root unavailable"
                );
                let reason = err.to_string();
                match self.config.on_stack_failure {
                    StackFailurePolicy::ScanStaticOnly => StackRootStatus::Skipped { reason },
                    StackFailurePolicy::AbortCycle => {
                        let report = CycleReport::aborted(
                            self.table.len(),
                            StackRootStatus::Skipped { reason: reason.clone() },
                            reason,
                        );
                        self.stats.record_cycle(&report);
                        return Err(err);
                    }
                }
            }
        };

        // SAFETY: static ranges are either loaded writable segments or a
        // host region whose readability was promised when it was recorded.
        // The stack range runs from the live stack pointer to the end of
        // this thread's mapped stack.
        Ok(unsafe { self.run_cycle(&roots, stack_root) })
    }

    unsafe fn run_cycle(&mut self, roots: &RootSet, stack_root: StackRootStatus) -> CycleReport {
        let span = span_operation("gc_cycle");
        let started = Instant::now();
        debug_assert_eq!(self.state, CycleState::Idle);

        self.state = CycleState::Marking;
        self.table.reset_marks();
        let scan = {
            let mut scanner = Scanner::new(&mut self.table);
            for range in roots.ranges() {
                debug!(
                    kind = ?range.kind(),
                    start = %format_args!("0x{:x}", range.start()),
                    end = %format_args!("0x{:x}", range.end()),
                    "scanning root range"
                );
                scanner.scan(range);
            }
            scanner.finish()
        };

        self.state = CycleState::Sweeping;
        let sweep = self.table.sweep();
        self.state = CycleState::Idle;

        let elapsed = started.elapsed();
        let report = CycleReport::completed(
            scan,
            sweep,
            self.table.len(),
            stack_root,
            elapsed.as_micros() as u64,
        );
        self.stats.record_cycle(&report);

        span.record_items_processed(report.words_scanned);
        span.record_result(true);
        info!(
            trace_id = %span.trace_id(),
            freed_blocks = report.freed_blocks,
            freed_bytes = report.freed_bytes,
            marked_blocks = report.marked_blocks,
            words_scanned = report.words_scanned,
            "garbage collected {} objects freeing {} bytes",
            report.freed_blocks,
            report.freed_bytes
        );
        if elapsed.as_millis() > SLOW_CYCLE_MS {
            warn!(
                duration_ms = elapsed.as_millis() as u64,
                live_blocks = report.live_blocks,
                "slow collection cycle"
            );
        }
        report
    }
}

fn optional_range(a: Address, b: Address, kind: RootKind) -> GcResult<Option<RootRange>> {
    match (a, b) {
        (0, 0) => Ok(None),
        _ => RootRange::checked(a, b, kind).map(Some),
    }
}

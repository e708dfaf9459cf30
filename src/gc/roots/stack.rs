/*!
 * Stack Roots
 * Stack-pointer capture, callee-saved register spill, and stack bounds
 *
 * A cycle scans from the stack pointer captured at the moment collection is
 * requested up to the logical end of the current thread's stack. Pointers
 * held only in callee-saved registers are spilled into the capturing frame
 * first so that they land inside the scanned span.
 */

use super::{RootKind, RootRange};
use crate::core::errors::{GcError, GcResult};
use crate::core::limits::PROC_STAT_STARTSTACK_FIELD;
use crate::core::types::{Address, Size};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where the logical end of the stack is learned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackSource {
    /// The calling thread's own stack mapping (pthread attributes)
    ThreadAttributes,
    /// `startstack` from /proc/self/stat; only valid on the main thread
    ProcStat,
}

impl Default for StackSource {
    fn default() -> Self {
        StackSource::ThreadAttributes
    }
}

impl FromStr for StackSource {
    type Err = GcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread" | "thread_attributes" | "pthread" => Ok(StackSource::ThreadAttributes),
            "proc" | "proc_stat" | "procstat" => Ok(StackSource::ProcStat),
            other => Err(GcError::Configuration(format!(
                "unknown stack source '{}', expected thread_attributes or proc_stat",
                other
            ))),
        }
    }
}

#[cfg(target_arch = "x86_64")]
const SPILL_SLOTS: usize = 6;
#[cfg(target_arch = "aarch64")]
const SPILL_SLOTS: usize = 11;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const SPILL_SLOTS: usize = 1;

/// Register and stack-pointer state captured when a cycle begins
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct StackSnapshot {
    registers: [usize; SPILL_SLOTS],
    stack_pointer: Address,
}

impl StackSnapshot {
    pub fn stack_pointer(&self) -> Address {
        self.stack_pointer
    }

    /// Callee-saved register values at capture time
    pub fn registers(&self) -> &[usize] {
        &self.registers
    }
}

/// Run `f` with a snapshot taken in a frame that stays live for the call
///
/// Everything at or above the captured stack pointer, including the spilled
/// registers and every caller frame, is inside the stack root range.
#[inline(never)]
pub fn with_stack_snapshot<R>(f: impl FnOnce(&StackSnapshot) -> R) -> R {
    let mut snapshot = StackSnapshot {
        registers: [0; SPILL_SLOTS],
        stack_pointer: 0,
    };
    spill_registers(&mut snapshot.registers);
    snapshot.stack_pointer = current_stack_pointer();

    let snapshot = std::hint::black_box(snapshot);
    let result = f(&snapshot);
    std::hint::black_box(&snapshot);
    result
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn spill_registers(slots: &mut [usize; SPILL_SLOTS]) {
    // SAFETY: writes six words into `slots`, reads only registers.
    unsafe {
        std::arch::asm!(
            "mov [{0}], rbx",
            "mov [{0} + 8], rbp",
            "mov [{0} + 16], r12",
            "mov [{0} + 24], r13",
            "mov [{0} + 32], r14",
            "mov [{0} + 40], r15",
            in(reg) slots.as_mut_ptr(),
            options(nostack, preserves_flags),
        );
    }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn spill_registers(slots: &mut [usize; SPILL_SLOTS]) {
    // SAFETY: writes eleven words into `slots`, reads only registers.
    unsafe {
        std::arch::asm!(
            "stp x19, x20, [{0}]",
            "stp x21, x22, [{0}, #16]",
            "stp x23, x24, [{0}, #32]",
            "stp x25, x26, [{0}, #48]",
            "stp x27, x28, [{0}, #64]",
            "str x29, [{0}, #80]",
            in(reg) slots.as_mut_ptr(),
            options(nostack, preserves_flags),
        );
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn spill_registers(slots: &mut [usize; SPILL_SLOTS]) {
    std::hint::black_box(slots);
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn current_stack_pointer() -> Address {
    let sp: usize;
    // SAFETY: reads rsp only.
    unsafe {
        std::arch::asm!("mov {}, rsp", out(reg) sp, options(nomem, nostack, preserves_flags));
    }
    sp
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn current_stack_pointer() -> Address {
    let sp: usize;
    // SAFETY: reads sp only.
    unsafe {
        std::arch::asm!("mov {}, sp", out(reg) sp, options(nomem, nostack, preserves_flags));
    }
    sp
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn current_stack_pointer() -> Address {
    let marker = 0usize;
    std::hint::black_box(&marker) as *const usize as Address
}

/// Overwrite roughly `bytes` of dead stack below the caller with zeros
///
/// Stale copies of pointers left behind by returned frames keep blocks
/// alive under conservative scanning; scrubbing before a cycle drops them.
#[inline(never)]
pub fn scrub_stack(bytes: Size) {
    let mut buffer = [0u8; 1024];
    std::hint::black_box(&mut buffer);
    if bytes > buffer.len() {
        scrub_stack(bytes - buffer.len());
    }
    std::hint::black_box(&buffer);
}

/// Address span of the current thread's stack, `low <= high`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBounds {
    pub low: Address,
    /// Logical end of the stack (the "bottom" for a downward-growing stack)
    pub high: Address,
}

impl StackBounds {
    pub fn discover(source: StackSource) -> GcResult<Self> {
        match source {
            StackSource::ThreadAttributes => Self::from_thread_attributes(),
            StackSource::ProcStat => Self::from_proc_stat(),
        }
    }

    /// Span from `stack_pointer` up to the logical end of the stack
    pub fn range_from(&self, stack_pointer: Address) -> GcResult<RootRange> {
        if stack_pointer < self.low || stack_pointer >= self.high {
            return Err(GcError::StackIntrospection(format!(
                "stack pointer 0x{:x} outside stack bounds 0x{:x}..0x{:x}",
                stack_pointer, self.low, self.high
            )));
        }
        Ok(RootRange::new(stack_pointer, self.high, RootKind::Stack))
    }

    #[cfg(target_os = "linux")]
    fn from_thread_attributes() -> GcResult<Self> {
        use nix::libc;

        // SAFETY: `attr` is initialized by pthread_getattr_np before use and
        // destroyed exactly once.
        unsafe {
            let mut attr: libc::pthread_attr_t = std::mem::zeroed();
            let rc = libc::pthread_getattr_np(libc::pthread_self(), &mut attr);
            if rc != 0 {
                return Err(GcError::StackIntrospection(format!(
                    "pthread_getattr_np failed with code {}",
                    rc
                )));
            }

            let mut addr: *mut libc::c_void = std::ptr::null_mut();
            let mut size: libc::size_t = 0;
            let rc = libc::pthread_attr_getstack(&attr, &mut addr, &mut size);
            libc::pthread_attr_destroy(&mut attr);

            if rc != 0 || addr.is_null() || size == 0 {
                return Err(GcError::StackIntrospection(format!(
                    "pthread_attr_getstack failed with code {}",
                    rc
                )));
            }

            let low = addr as Address;
            Ok(Self {
                low,
                high: low + size,
            })
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn from_thread_attributes() -> GcResult<Self> {
        Err(GcError::StackIntrospection(
            "thread stack attributes are only read on Linux".into(),
        ))
    }

    #[cfg(target_os = "linux")]
    fn from_proc_stat() -> GcResult<Self> {
        use nix::unistd::{getpid, gettid};

        if gettid() != getpid() {
            return Err(GcError::StackIntrospection(
                "/proc/self/stat startstack only describes the main thread".into(),
            ));
        }

        let contents = std::fs::read_to_string("/proc/self/stat").map_err(|e| {
            GcError::StackIntrospection(format!("cannot read /proc/self/stat: {}", e))
        })?;
        let high = parse_startstack(&contents)?;
        Ok(Self { low: 0, high })
    }

    #[cfg(not(target_os = "linux"))]
    fn from_proc_stat() -> GcResult<Self> {
        Err(GcError::StackIntrospection(
            "/proc/self/stat is only available on Linux".into(),
        ))
    }
}

/// Extract `startstack` from the contents of /proc/[pid]/stat
///
/// The command name (field 2) may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub fn parse_startstack(contents: &str) -> GcResult<Address> {
    let rest = contents
        .rfind(')')
        .map(|idx| &contents[idx + 1..])
        .ok_or_else(|| GcError::StackIntrospection("malformed stat line: no ')'".into()))?;

    // `rest` begins at field 3 (state)
    let field = rest
        .split_whitespace()
        .nth(PROC_STAT_STARTSTACK_FIELD - 3)
        .ok_or_else(|| GcError::StackIntrospection("stat line too short".into()))?;

    let value: Address = field.parse().map_err(|_| {
        GcError::StackIntrospection(format!("startstack field '{}' is not a number", field))
    })?;

    if value == 0 {
        return Err(GcError::StackIntrospection(
            "startstack is hidden (reported as 0)".into(),
        ));
    }
    Ok(value)
}

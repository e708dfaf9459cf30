/*!
 * Static Roots
 * Writable static segments of the running executable
 *
 * Hosts normally hand over the static bounds themselves (for example the
 * linker-provided `etext`/`end` symbols). When they do not, the writable
 * `PT_LOAD` segments of the main program (.data, .bss, and relocated
 * read-only data) stand in for that span.
 */

use super::{RootKind, RootRange};
use crate::core::errors::{GcError, GcResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the collector learns its static roots at init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticRootsSource {
    /// Ask the dynamic loader for the executable's writable segments
    Discover,
    /// Start without static roots; the host supplies them per cycle
    None,
}

impl Default for StaticRootsSource {
    fn default() -> Self {
        StaticRootsSource::Discover
    }
}

impl FromStr for StaticRootsSource {
    type Err = GcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discover" | "auto" => Ok(StaticRootsSource::Discover),
            "none" | "explicit" => Ok(StaticRootsSource::None),
            other => Err(GcError::Configuration(format!(
                "unknown static roots source '{}', expected discover or none",
                other
            ))),
        }
    }
}

impl StaticRootsSource {
    pub fn resolve(self) -> GcResult<Vec<RootRange>> {
        match self {
            StaticRootsSource::Discover => discover_writable_segments(),
            StaticRootsSource::None => Ok(Vec::new()),
        }
    }
}

#[cfg(target_os = "linux")]
fn discover_writable_segments() -> GcResult<Vec<RootRange>> {
    use nix::libc;

    unsafe extern "C" fn visit(
        info: *mut libc::dl_phdr_info,
        _size: libc::size_t,
        data: *mut libc::c_void,
    ) -> libc::c_int {
        // SAFETY: `data` is the Vec passed below; `info` is valid for the
        // duration of the callback.
        let ranges = &mut *(data as *mut Vec<RootRange>);
        let info = &*info;
        if info.dlpi_phdr.is_null() {
            return 1;
        }

        let base = info.dlpi_addr as usize;
        let headers = std::slice::from_raw_parts(info.dlpi_phdr, info.dlpi_phnum as usize);
        for header in headers {
            if header.p_type == libc::PT_LOAD && header.p_flags & libc::PF_W != 0 {
                let start = base + header.p_vaddr as usize;
                let end = start + header.p_memsz as usize;
                ranges.push(RootRange::new(start, end, RootKind::Static));
            }
        }

        // The main program is reported first; shared objects are not roots
        1
    }

    let mut ranges: Vec<RootRange> = Vec::new();
    // SAFETY: `visit` only touches `ranges` through the data pointer.
    unsafe {
        libc::dl_iterate_phdr(Some(visit), &mut ranges as *mut Vec<RootRange> as *mut libc::c_void);
    }

    if ranges.is_empty() {
        return Err(GcError::StaticRegion(
            "main program has no writable PT_LOAD segment".into(),
        ));
    }

    for range in &ranges {
        log::debug!(
            "Static root segment 0x{:x}..0x{:x} ({} bytes)",
            range.start(),
            range.end(),
            range.len()
        );
    }
    Ok(ranges)
}

#[cfg(not(target_os = "linux"))]
fn discover_writable_segments() -> GcResult<Vec<RootRange>> {
    Err(GcError::StaticRegion(
        "static segment discovery is only implemented for Linux".into(),
    ))
}

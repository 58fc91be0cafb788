//! Process memory usage
//!
//! Resident set size of the current process, read from `/proc/self/statm` on
//! Linux. Other platforms report nothing.

use serde::Serialize;

/// Snapshot of the process memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// Resident set size in bytes
    pub resident_bytes: u64,
    /// Virtual size in bytes
    pub virtual_bytes: u64,
}

impl MemoryUsage {
    /// Current usage, `None` where it cannot be read
    pub fn current() -> Option<Self> {
        read_current()
    }
}

#[cfg(target_os = "linux")]
fn read_current() -> Option<MemoryUsage> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    parse_statm(&statm, page_size()?)
}

#[cfg(not(target_os = "linux"))]
fn read_current() -> Option<MemoryUsage> {
    None
}

#[cfg(target_os = "linux")]
fn page_size() -> Option<u64> {
    // SAFETY: sysconf only reads a system constant
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(size).ok().filter(|&s| s > 0)
}

/// `size resident shared ...`, all in pages
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_statm(statm: &str, page_size: u64) -> Option<MemoryUsage> {
    let mut fields = statm.split_whitespace().map(str::parse::<u64>);
    let virtual_pages = fields.next()?.ok()?;
    let resident_pages = fields.next()?.ok()?;
    Some(MemoryUsage {
        resident_bytes: resident_pages.saturating_mul(page_size),
        virtual_bytes: virtual_pages.saturating_mul(page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statm() {
        let usage = parse_statm("2048 512 100 10 0 300 0\n", 4096).unwrap();
        assert_eq!(usage.resident_bytes, 512 * 4096);
        assert_eq!(usage.virtual_bytes, 2048 * 4096);

        assert!(parse_statm("", 4096).is_none());
        assert!(parse_statm("12 abc", 4096).is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_usage_is_nonzero() {
        let usage = MemoryUsage::current().unwrap();
        assert!(usage.resident_bytes > 0);
        assert!(usage.virtual_bytes >= usage.resident_bytes);
    }
}

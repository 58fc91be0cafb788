//! Memory - 대용량 입력 처리 후 메모리 회수
//!
//! - [`MemoryReclaimer`]: runs registered [`ReclaimHook`]s after an operation
//!   whose input or output exceeded the configured threshold
//! - [`chunk`]: bounded-chunk processing of oversized inputs
//! - [`MemoryFootprint`]: approximate heap size of a cached value
//! - [`MemoryUsage`]: resident memory of the process, for the stats display

pub mod chunk;
mod reclaimer;
mod usage;

pub use chunk::{
    process_in_chunks, process_text_in_chunks, process_text_in_chunks_async, split_text_chunks,
};
pub use reclaimer::{AllocatorTrim, MemoryReclaimer, ReclaimConfig, ReclaimHook, ReclaimStats};
pub use usage::MemoryUsage;

/// Approximate heap footprint in bytes
///
/// Used as the size hint for [`MemoryReclaimer::maybe_reclaim`] once an
/// operation has produced its value.
pub trait MemoryFootprint {
    fn footprint(&self) -> usize;
}

impl MemoryFootprint for String {
    fn footprint(&self) -> usize {
        self.len()
    }
}

impl MemoryFootprint for str {
    fn footprint(&self) -> usize {
        self.len()
    }
}

impl MemoryFootprint for Vec<u8> {
    fn footprint(&self) -> usize {
        self.len()
    }
}

impl<T: MemoryFootprint + ?Sized> MemoryFootprint for std::sync::Arc<T> {
    fn footprint(&self) -> usize {
        (**self).footprint()
    }
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_footprint() {
        let text = "report".to_string();
        assert_eq!(text.footprint(), 6);
        assert_eq!(std::sync::Arc::new(text).footprint(), 6);
    }
}

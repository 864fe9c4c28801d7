//! Machine-level values read from the /proc filesystem and sysconf.
//!
//! Provides total RAM (for memory percentages), the kernel clock tick rate
//! (for CPU time conversion) and the page size (for statm resident pages).

use std::fs;
use std::io;
use std::path::Path;

/// Reads total RAM in bytes from `<proc_root>/meminfo`.
pub fn total_memory_bytes(proc_root: &Path) -> io::Result<u64> {
    let content = fs::read_to_string(proc_root.join("meminfo"))?;
    parse_mem_total(&content)
        .ok_or_else(|| io::Error::other("MemTotal not found in meminfo"))
}

/// Parses the "MemTotal:  16384000 kB" line, returning bytes.
fn parse_mem_total(content: &str) -> Option<u64> {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

/// Kernel clock ticks per second (USER_HZ), used to convert stat jiffies
/// into seconds. Falls back to the common value of 100 if sysconf fails.
pub fn clock_ticks_per_second() -> f64 {
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as f64
    } else {
        100.0
    }
}

/// System page size in bytes, used to convert statm resident pages.
pub fn page_size_bytes() -> u64 {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_mem_total() {
        let meminfo = "MemTotal:       16384000 kB\n\
                       MemFree:         8192000 kB\n\
                       MemAvailable:   12288000 kB\n";
        assert_eq!(parse_mem_total(meminfo), Some(16384000 * 1024));
    }

    #[test]
    fn test_parse_mem_total_missing() {
        let meminfo = "MemFree:         8192000 kB\n";
        assert_eq!(parse_mem_total(meminfo), None);
    }

    #[test]
    fn test_total_memory_bytes_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("meminfo")).unwrap();
        writeln!(file, "MemTotal:       1048576 kB").unwrap();

        let total = total_memory_bytes(dir.path()).unwrap();
        assert_eq!(total, 1048576 * 1024);
    }

    #[test]
    fn test_total_memory_bytes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(total_memory_bytes(dir.path()).is_err());
    }

    #[test]
    fn test_sysconf_values_are_sane() {
        assert!(clock_ticks_per_second() > 0.0);
        assert!(page_size_bytes() >= 4096);
    }
}

//! Per-process CPU and memory collection from the /proc filesystem.
//!
//! One collection pass runs per scrape and produces a vector of ephemeral
//! [`ProcessSample`]s. A process whose name cannot be read is skipped
//! entirely; CPU and memory percentages are attempted independently and each
//! failure omits only that one field. The only state kept across passes is
//! the per-PID CPU time baseline needed to turn monotonic CPU time into a
//! usage percentage, which is why the first observation of a PID reports no
//! CPU value.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::system;

/// Process entry representing a directory in /proc filesystem
#[derive(Debug, Clone)]
struct ProcEntry {
    pid: u32,
    proc_path: PathBuf,
}

/// One process observed during a collection pass. Recomputed every scrape,
/// no identity across scrapes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
}

/// CPU time observation used as the baseline for the next delta.
struct CpuObservation {
    cpu_time_seconds: f64,
    taken_at: Instant,
}

/// Collects per-process samples from a /proc-style directory tree.
pub struct ProcessCollector {
    proc_root: PathBuf,
    ticks_per_second: f64,
    page_size: u64,
    total_memory: Option<u64>,
    cpu_history: Mutex<HashMap<u32, CpuObservation>>,
}

impl ProcessCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        let proc_root = proc_root.into();

        // Without MemTotal the memory percentage stays absent for every
        // process; CPU and identity metrics are unaffected.
        let total_memory = match system::total_memory_bytes(&proc_root) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    "Failed to read total memory from {}/meminfo: {}",
                    proc_root.display(),
                    e
                );
                None
            }
        };

        Self {
            proc_root,
            ticks_per_second: system::clock_ticks_per_second(),
            page_size: system::page_size_bytes(),
            total_memory,
            cpu_history: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_parameters(
        proc_root: impl Into<PathBuf>,
        ticks_per_second: f64,
        page_size: u64,
        total_memory: Option<u64>,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            ticks_per_second,
            page_size,
            total_memory,
            cpu_history: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one collection pass over all visible processes.
    ///
    /// A total enumeration failure is logged and yields an empty vector;
    /// the scrape itself still succeeds.
    pub fn collect(&self) -> Vec<ProcessSample> {
        let entries = match self.proc_entries() {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error getting processes: {}", e);
                return Vec::new();
            }
        };

        let mut samples = Vec::with_capacity(entries.len());
        for entry in &entries {
            let name = match read_process_name(&entry.proc_path) {
                Some(name) => name,
                None => {
                    debug!("Skipping process {}: could not read name", entry.pid);
                    continue;
                }
            };

            samples.push(ProcessSample {
                pid: entry.pid,
                name,
                cpu_percent: self.cpu_percent(entry.pid, &entry.proc_path),
                memory_percent: self.memory_percent(&entry.proc_path),
            });
        }

        self.prune_cpu_history(&entries);
        samples
    }

    /// Scans the proc root for process directories with numeric PIDs.
    /// Directory order is preserved; no sorting or deduplication.
    fn proc_entries(&self) -> io::Result<Vec<ProcEntry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.proc_root)? {
            let entry = entry?;
            let path = entry.path();
            let name = match path.file_name().and_then(|s| s.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let pid: u32 = match name.parse() {
                Ok(pid) => pid,
                Err(_) => continue,
            };
            out.push(ProcEntry {
                pid,
                proc_path: path,
            });
        }
        Ok(out)
    }

    /// CPU usage percent as the delta against the previous observation of
    /// this PID. Returns `None` on the first observation or when the stat
    /// file cannot be read.
    fn cpu_percent(&self, pid: u32, proc_path: &Path) -> Option<f64> {
        let now = Instant::now();
        let cpu_time_seconds = match parse_cpu_time_seconds(proc_path, self.ticks_per_second) {
            Ok(seconds) => seconds,
            Err(e) => {
                debug!("Failed to read CPU time for pid {}: {}", pid, e);
                return None;
            }
        };

        let mut history = self.cpu_history.lock().ok()?;
        let previous = history.insert(
            pid,
            CpuObservation {
                cpu_time_seconds,
                taken_at: now,
            },
        )?;

        let dt = now.duration_since(previous.taken_at).as_secs_f64();
        if dt <= 0.0 {
            return None;
        }

        let delta_cpu = (cpu_time_seconds - previous.cpu_time_seconds).max(0.0);
        Some((delta_cpu / dt) * 100.0)
    }

    /// Resident memory as a percentage of total RAM, from statm.
    fn memory_percent(&self, proc_path: &Path) -> Option<f64> {
        let total = self.total_memory? as f64;
        let content = match fs::read_to_string(proc_path.join("statm")) {
            Ok(content) => content,
            Err(e) => {
                debug!("Failed to read statm for {}: {}", proc_path.display(), e);
                return None;
            }
        };

        let resident_pages = parse_statm_resident_pages(&content)?;
        let resident_bytes = resident_pages * self.page_size;
        Some(resident_bytes as f64 / total * 100.0)
    }

    /// Drops CPU baselines for PIDs that were not seen in this pass.
    fn prune_cpu_history(&self, entries: &[ProcEntry]) {
        if let Ok(mut history) = self.cpu_history.lock() {
            let seen: std::collections::HashSet<u32> = entries.iter().map(|e| e.pid).collect();
            history.retain(|pid, _| seen.contains(pid));
        }
    }
}

/// Reads process name from comm file or extracts it from cmdline.
fn read_process_name(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(s) = fs::read_to_string(&comm) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        if !content.is_empty() {
            let first = content.split(|&b| b == 0u8).next()?;
            let arg = std::str::from_utf8(first).ok()?;
            if let Some(name) = Path::new(arg).file_name() {
                return name.to_str().map(|s| s.to_string());
            }
        }
    }
    None
}

/// Parse total CPU time (user+system) in seconds from /proc/<pid>/stat.
///
/// Fields are located after the last `)` so command names containing spaces
/// or parentheses do not shift the field positions.
fn parse_cpu_time_seconds(proc_path: &Path, ticks_per_second: f64) -> io::Result<f64> {
    let content = fs::read_to_string(proc_path.join("stat"))?;

    let (_, rest) = content
        .rsplit_once(')')
        .ok_or_else(|| io::Error::other("invalid stat format"))?;

    // After the comm field: state is field 3, utime field 14, stime field 15.
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() <= 12 {
        return Err(io::Error::other("invalid stat format"));
    }

    let utime: f64 = parts[11].parse().unwrap_or(0.0);
    let stime: f64 = parts[12].parse().unwrap_or(0.0);

    Ok((utime + stime) / ticks_per_second)
}

/// Parses the resident-pages field (second column) of /proc/<pid>/statm.
fn parse_statm_resident_pages(content: &str) -> Option<u64> {
    content.split_whitespace().nth(1)?.parse().ok()
}

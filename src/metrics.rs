//! Prometheus metric definitions for per-process exposition.
//!
//! All metrics are registered on an explicitly constructed
//! [`prometheus::Registry`] that is handed to the HTTP handler through
//! application state; there is no global registry.

use anyhow::Result;
use prometheus::{GaugeVec, Opts, Registry};

use crate::collector::ProcessSample;

const NAMESPACE: &str = "process";

/// The three exported series, each labeled by (pid, name).
#[derive(Clone)]
pub struct ProcessMetrics {
    info: GaugeVec,
    cpu_usage: GaugeVec,
    memory_usage: GaugeVec,
}

impl ProcessMetrics {
    /// Creates and registers all metrics with the given registry.
    pub fn new(registry: &Registry) -> Result<Self> {
        let labels = &["pid", "name"];

        let info = GaugeVec::new(
            Opts::new("info", "Process information with pid and name").namespace(NAMESPACE),
            labels,
        )?;
        let cpu_usage = GaugeVec::new(
            Opts::new("cpu_usage", "Process CPU usage percentage").namespace(NAMESPACE),
            labels,
        )?;
        let memory_usage = GaugeVec::new(
            Opts::new("memory_usage", "Process memory usage percentage").namespace(NAMESPACE),
            labels,
        )?;

        registry.register(Box::new(info.clone()))?;
        registry.register(Box::new(cpu_usage.clone()))?;
        registry.register(Box::new(memory_usage.clone()))?;

        Ok(Self {
            info,
            cpu_usage,
            memory_usage,
        })
    }

    /// Resets all metrics (used before populating with fresh samples so
    /// processes that exited since the last scrape disappear).
    pub fn reset(&self) {
        self.info.reset();
        self.cpu_usage.reset();
        self.memory_usage.reset();
    }

    /// Records one process sample. The info gauge carries the PID as its
    /// value; CPU and memory gauges are set only when the field was
    /// successfully collected.
    pub fn record(&self, sample: &ProcessSample) {
        let pid = sample.pid.to_string();
        let labels = &[pid.as_str(), sample.name.as_str()];

        self.info.with_label_values(labels).set(sample.pid as f64);

        if let Some(cpu_percent) = sample.cpu_percent {
            self.cpu_usage.with_label_values(labels).set(cpu_percent);
        }
        if let Some(memory_percent) = sample.memory_percent {
            self.memory_usage
                .with_label_values(labels)
                .set(memory_percent);
        }
    }
}

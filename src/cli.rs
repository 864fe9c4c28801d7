//! CLI arguments for linux-process-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including the web configuration flags and listen-address parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "linux-process-exporter",
    about = "Prometheus exporter for per-process CPU and memory usage metrics",
    version = "1.0.0"
)]
pub struct Args {
    /// Path to configuration file for TLS and basic auth settings
    #[arg(long = "web.config.file")]
    pub web_config_file: Option<PathBuf>,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", default_value = ":9113")]
    pub web_listen_address: String,

    /// Log level
    #[arg(long = "log.level", value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Parses a listen address, accepting the port-only `:9113` shorthand
/// which binds all interfaces.
pub fn parse_listen_address(addr: &str) -> anyhow::Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_owned()
    };

    full.parse()
        .with_context(|| format!("invalid listen address '{addr}'"))
}

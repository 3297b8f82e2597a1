//! Metrics export to JSON files and stdout.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};
use std::path::PathBuf;

pub trait MetricsExporter: Send + Sync {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Writes each snapshot as pretty-printed JSON, replacing the file.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let serializable = SerializableSnapshot::from(snapshot);
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))?;

        std::fs::write(&self.output_path, json)
            .map_err(|e| Error::telemetry(format!("failed to write metrics file: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    kernels_compiled: u64,
    kernel_launches: u64,
    host_dispatches: u64,
    device_dispatches: u64,
    offload_ratio: f64,
    mb_to_device: f64,
    mb_from_device: f64,
    commands_executed: u64,
    commands_failed: u64,
    avg_latency_us: f64,
    p50_latency_us: f64,
    p99_latency_us: f64,
    max_latency_us: f64,
}

const MB: f64 = 1024.0 * 1024.0;

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(s: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: s.uptime.as_secs_f64(),
            kernels_compiled: s.kernels_compiled,
            kernel_launches: s.kernel_launches,
            host_dispatches: s.host_dispatches,
            device_dispatches: s.device_dispatches,
            offload_ratio: s.offload_ratio(),
            mb_to_device: s.bytes_to_device as f64 / MB,
            mb_from_device: s.bytes_from_device as f64 / MB,
            commands_executed: s.commands_executed,
            commands_failed: s.commands_failed,
            avg_latency_us: s.avg_latency_ns as f64 / 1_000.0,
            p50_latency_us: s.p50_latency_ns as f64 / 1_000.0,
            p99_latency_us: s.p99_latency_ns as f64 / 1_000.0,
            max_latency_us: s.max_latency_ns as f64 / 1_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl MetricsExporter for ConsoleExporter {
    fn export(&self, s: &MetricsSnapshot) -> Result<()> {
        println!("=== clmath device metrics ===");
        println!("Uptime: {:.2}s", s.uptime.as_secs_f64());
        println!("Kernels compiled: {}", s.kernels_compiled);
        println!(
            "Kernel launches: {} ({:.2}/s)",
            s.kernel_launches,
            s.launches_per_second()
        );
        println!(
            "Dispatch: {} host / {} device ({:.1}% offloaded)",
            s.host_dispatches,
            s.device_dispatches,
            s.offload_ratio() * 100.0
        );

        if self.verbose {
            println!("\nTransfers:");
            println!("  To device: {:.2}MB", s.bytes_to_device as f64 / MB);
            println!("  From device: {:.2}MB", s.bytes_from_device as f64 / MB);

            println!("\nQueue:");
            println!("  Executed: {}", s.commands_executed);
            println!("  Failed: {}", s.commands_failed);
            println!("  Average: {:.2}μs", s.avg_latency_ns as f64 / 1_000.0);
            println!("  P50: {:.2}μs", s.p50_latency_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", s.p99_latency_ns as f64 / 1_000.0);
            println!("  Max: {:.2}μs", s.max_latency_ns as f64 / 1_000.0);
        }

        println!("=============================");

        Ok(())
    }
}

impl Default for ConsoleExporter {
    fn default() -> Self {
        Self::new(false)
    }
}

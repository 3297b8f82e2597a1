//! Counters and latency tracking for device work.
//!
//! With the `telemetry` feature disabled, [`Metrics`] is a zero-sized stub
//! with the same recording surface so call sites need no `cfg` guards.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub mod export;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

#[cfg(feature = "telemetry")]
pub use export::{ConsoleExporter, JsonExporter, MetricsExporter};

#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }
        pub fn record_kernel_compiled(&self) {}
        pub fn record_kernel_launch(&self) {}
        pub fn record_dispatch(&self, _offloaded: bool) {}
        pub fn record_transfer_to_device(&self, _bytes: usize) {}
        pub fn record_transfer_from_device(&self, _bytes: usize) {}
        pub fn record_command(&self, _duration_ns: u64) {}
        pub fn record_command_failed(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
        pub fn reset(&self) {}
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub uptime: Duration,
        pub kernels_compiled: u64,
        pub kernel_launches: u64,
        pub host_dispatches: u64,
        pub device_dispatches: u64,
        pub bytes_to_device: u64,
        pub bytes_from_device: u64,
        pub commands_executed: u64,
        pub commands_failed: u64,
        pub avg_latency_ns: u64,
        pub p50_latency_ns: u64,
        pub p99_latency_ns: u64,
        pub max_latency_ns: u64,
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};

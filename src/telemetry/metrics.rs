//! Counters for compile, launch, dispatch and transfer activity.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Device activity collector, one per [`DeviceContext`](crate::device::DeviceContext).
#[derive(Debug)]
pub struct Metrics {
    kernels_compiled: AtomicU64,
    kernel_launches: AtomicU64,

    host_dispatches: AtomicU64,
    device_dispatches: AtomicU64,

    bytes_to_device: AtomicU64,
    bytes_from_device: AtomicU64,

    commands_executed: AtomicU64,
    commands_failed: AtomicU64,

    // None only if the histogram bounds are rejected
    latency_histogram: RwLock<Option<Histogram<u64>>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // 3 significant figures, up to one hour in nanoseconds
        let histogram = Histogram::new_with_max(3_600_000_000_000, 3).ok();

        Self {
            kernels_compiled: AtomicU64::new(0),
            kernel_launches: AtomicU64::new(0),
            host_dispatches: AtomicU64::new(0),
            device_dispatches: AtomicU64::new(0),
            bytes_to_device: AtomicU64::new(0),
            bytes_from_device: AtomicU64::new(0),
            commands_executed: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            latency_histogram: RwLock::new(histogram),
            start_time: Instant::now(),
        }
    }

    pub fn record_kernel_compiled(&self) {
        self.kernels_compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_kernel_launch(&self) {
        self.kernel_launches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one dispatch-site decision.
    pub fn record_dispatch(&self, offloaded: bool) {
        if offloaded {
            self.device_dispatches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.host_dispatches.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_transfer_to_device(&self, bytes: usize) {
        self.bytes_to_device.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_transfer_from_device(&self, bytes: usize) {
        self.bytes_from_device
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a host-queue command that ran to completion.
    pub fn record_command(&self, duration_ns: u64) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);

        if let Some(mut hist) = self.latency_histogram.try_write() {
            if let Some(hist) = hist.as_mut() {
                let _ = hist.record(duration_ns);
            }
        }
    }

    pub fn record_command_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.latency_histogram.read();
        let (avg, p50, p99, max) = match histogram.as_ref() {
            Some(h) if h.len() > 0 => (
                h.mean() as u64,
                h.value_at_quantile(0.50),
                h.value_at_quantile(0.99),
                h.max(),
            ),
            _ => (0, 0, 0, 0),
        };

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            kernels_compiled: self.kernels_compiled.load(Ordering::Relaxed),
            kernel_launches: self.kernel_launches.load(Ordering::Relaxed),
            host_dispatches: self.host_dispatches.load(Ordering::Relaxed),
            device_dispatches: self.device_dispatches.load(Ordering::Relaxed),
            bytes_to_device: self.bytes_to_device.load(Ordering::Relaxed),
            bytes_from_device: self.bytes_from_device.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            avg_latency_ns: avg,
            p50_latency_ns: p50,
            p99_latency_ns: p99,
            max_latency_ns: max,
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.kernels_compiled,
            &self.kernel_launches,
            &self.host_dispatches,
            &self.device_dispatches,
            &self.bytes_to_device,
            &self.bytes_from_device,
            &self.commands_executed,
            &self.commands_failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }

        if let Some(mut hist) = self.latency_histogram.try_write() {
            if let Some(hist) = hist.as_mut() {
                hist.reset();
            }
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
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

impl MetricsSnapshot {
    /// Share of dispatch decisions that went to the device (0.0 to 1.0).
    pub fn offload_ratio(&self) -> f64 {
        let total = self.host_dispatches + self.device_dispatches;
        if total == 0 {
            return 0.0;
        }
        self.device_dispatches as f64 / total as f64
    }

    pub fn launches_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.kernel_launches as f64 / seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_command(1000);
        metrics.record_command(2000);
        metrics.record_kernel_launch();
        metrics.record_transfer_to_device(800);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands_executed, 2);
        assert_eq!(snapshot.kernel_launches, 1);
        assert_eq!(snapshot.bytes_to_device, 800);
        assert!(snapshot.avg_latency_ns > 0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = Metrics::new();

        metrics.record_kernel_compiled();
        assert_eq!(metrics.snapshot().kernels_compiled, 1);

        metrics.reset();
        assert_eq!(metrics.snapshot().kernels_compiled, 0);
        assert_eq!(metrics.snapshot().avg_latency_ns, 0);
    }

    #[test]
    fn test_offload_ratio() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().offload_ratio(), 0.0);

        metrics.record_dispatch(true);
        metrics.record_dispatch(false);
        metrics.record_dispatch(false);
        metrics.record_dispatch(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.host_dispatches, 2);
        assert_eq!(snapshot.device_dispatches, 2);
        assert_eq!(snapshot.offload_ratio(), 0.5);
    }
}

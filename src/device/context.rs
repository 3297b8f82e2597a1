use super::{Backend, DeviceInfo, HostDevice};
use crate::config::{BackendKind, Config, TuningOpts};
use crate::error::Result;
use crate::kernel::{compile, CompiledKernel, KernelSource};
use crate::telemetry::Metrics;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name, full source text, host implementation and requested options.
/// Two kernels sharing a name but not a body are distinct entries.
type KernelKey = (String, String, Option<usize>, Vec<(String, i32)>);

/// One device, one command queue, and the state shared by every dispatch
/// against it: compile-option defaults, tuning thresholds and the table of
/// kernels built so far.
pub struct DeviceContext {
    backend: Backend,
    info: DeviceInfo,
    base_opts: BTreeMap<String, i32>,
    tuning: RwLock<TuningOpts>,
    kernels: Mutex<HashMap<KernelKey, Arc<CompiledKernel>>>,
    metrics: Arc<Metrics>,
}

impl DeviceContext {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(Metrics::new());
        let backend = match config.backend {
            BackendKind::Host => Backend::Host(HostDevice::new(&config, metrics.clone())?),
            #[cfg(feature = "opencl")]
            BackendKind::OpenCl => Backend::OpenCl(super::ClDevice::new(&config, metrics.clone())?),
        };
        let info = backend.info();

        let mut base_opts = config.base_opts.clone();
        fit_thread_block(&mut base_opts, info.max_work_group_size);

        tracing::debug!(
            device = %info.name,
            backend = ?info.backend,
            max_work_group_size = info.max_work_group_size,
            thread_block_size = base_opts.get("THREAD_BLOCK_SIZE").copied(),
            "device context created"
        );

        Ok(Self {
            backend,
            info,
            base_opts,
            tuning: RwLock::new(config.tuning),
            kernels: Mutex::new(HashMap::new()),
            metrics,
        })
    }

    /// Context on the host device with default settings.
    pub fn host() -> Result<Self> {
        Self::new(Config::default())
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Compile-option defaults, after fitting to the device.
    pub fn base_opts(&self) -> &BTreeMap<String, i32> {
        &self.base_opts
    }

    /// Current thresholds (a copy; dispatch sites re-read on every call).
    pub fn tuning(&self) -> TuningOpts {
        *self.tuning.read()
    }

    pub fn tuning_mut(&self) -> RwLockWriteGuard<'_, TuningOpts> {
        self.tuning.write()
    }

    pub fn set_tuning(&self, tuning: TuningOpts) {
        *self.tuning.write() = tuning;
    }

    /// Block until every command submitted to the queue has finished.
    pub fn finish(&self) -> Result<()> {
        self.backend.finish()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Number of distinct kernels built on this context.
    pub fn compiled_kernels(&self) -> usize {
        self.kernels.lock().len()
    }

    /// The kernel built from `source` with `requested` options, compiling
    /// and storing it on first use.
    pub fn kernel(
        &self,
        source: &KernelSource<'_>,
        requested: &BTreeMap<String, i32>,
    ) -> Result<Arc<CompiledKernel>> {
        let key: KernelKey = (
            source.name.to_string(),
            source.text(),
            source.host.map(|f| f as usize),
            requested.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        );

        // held across the build so concurrent first uses compile once
        let mut kernels = self.kernels.lock();
        if let Some(kernel) = kernels.get(&key) {
            return Ok(kernel.clone());
        }

        let kernel = Arc::new(compile(self, source, requested)?);
        kernels.insert(key, kernel.clone());
        Ok(kernel)
    }

    pub(crate) fn backend(&self) -> &Backend {
        &self.backend
    }
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("info", &self.info)
            .field("tuning", &self.tuning())
            .field("compiled_kernels", &self.compiled_kernels())
            .finish()
    }
}

/// Shrink `THREAD_BLOCK_SIZE` when a square tile of that size exceeds the
/// device's work-group limit.
fn fit_thread_block(opts: &mut BTreeMap<String, i32>, max_work_group_size: usize) {
    let side = i32::try_from(isqrt(max_work_group_size)).unwrap_or(i32::MAX);

    if matches!(opts.get("THREAD_BLOCK_SIZE"), Some(&tbs) if side < tbs) {
        opts.insert("THREAD_BLOCK_SIZE".to_string(), side);
        opts.insert("WORK_PER_THREAD".to_string(), 1);
    }
}

fn isqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

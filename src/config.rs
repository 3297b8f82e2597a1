use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Which device implementation backs a [`DeviceContext`](crate::device::DeviceContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process emulated device with an out-of-order worker queue.
    Host,

    #[cfg(feature = "opencl")]
    OpenCl,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Host
    }
}

/// Problem-size thresholds consulted by dispatch sites on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningOpts {
    /// `multiply` offloads when `rows(A) * cols(A) * cols(B)` exceeds this.
    pub multiply_dim_prod_worth_transfer: usize,
    /// Triangular solve/inverse offloads when `rows(A)` exceeds this.
    pub tri_inverse_size_worth_transfer: usize,
}

impl Default for TuningOpts {
    fn default() -> Self {
        Self {
            multiply_dim_prod_worth_transfer: 2_000_000,
            tri_inverse_size_worth_transfer: 100,
        }
    }
}

/// Context-wide compile option defaults. Kernels may lower these, never raise them.
pub fn default_base_opts() -> BTreeMap<String, i32> {
    [
        ("LOWER", 0),
        ("UPPER", 1),
        ("ENTIRE", 2),
        ("UPPER_TO_LOWER", 0),
        ("LOWER_TO_UPPER", 1),
        ("THREAD_BLOCK_SIZE", 32),
        ("WORK_PER_THREAD", 8),
        ("REDUCTION_STEP_SIZE", 4),
        ("LOCAL_SIZE_", 64),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub platform_index: usize,
    pub device_index: usize,

    /// Worker threads of the host queue; `None` means one per CPU.
    pub queue_threads: Option<usize>,
    /// Work-group limit reported by the host device.
    pub max_work_group_size: usize,
    pub thread_name_prefix: String,

    pub tuning: TuningOpts,
    pub base_opts: BTreeMap<String, i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            platform_index: 0,
            device_index: 0,
            queue_threads: None,
            max_work_group_size: 1024,
            thread_name_prefix: "clmath-queue".to_string(),
            tuning: TuningOpts::default(),
            base_opts: default_base_opts(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.queue_threads {
            if n == 0 {
                return Err(Error::config("queue_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("queue_threads too large (max 1024)"));
            }
        }

        if self.max_work_group_size == 0 {
            return Err(Error::config("max_work_group_size must be > 0"));
        }

        for (name, value) in &self.base_opts {
            if !is_identifier(name) {
                return Err(Error::config(format!(
                    "compile option `{}` is not a valid macro name",
                    name
                )));
            }
            if *value < 0 {
                return Err(Error::config(format!(
                    "compile option `{}` must be >= 0, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.queue_threads.unwrap_or_else(num_cpus::get)
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn platform_index(mut self, index: usize) -> Self {
        self.config.platform_index = index;
        self
    }

    pub fn device_index(mut self, index: usize) -> Self {
        self.config.device_index = index;
        self
    }

    pub fn queue_threads(mut self, n: usize) -> Self {
        self.config.queue_threads = Some(n);
        self
    }

    pub fn max_work_group_size(mut self, size: usize) -> Self {
        self.config.max_work_group_size = size;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn tuning(mut self, tuning: TuningOpts) -> Self {
        self.config.tuning = tuning;
        self
    }

    pub fn multiply_dim_prod_worth_transfer(mut self, threshold: usize) -> Self {
        self.config.tuning.multiply_dim_prod_worth_transfer = threshold;
        self
    }

    pub fn tri_inverse_size_worth_transfer(mut self, threshold: usize) -> Self {
        self.config.tuning.tri_inverse_size_worth_transfer = threshold;
        self
    }

    /// Set (or add) one context-wide compile option default.
    pub fn base_option<S: Into<String>>(mut self, name: S, value: i32) -> Self {
        self.config.base_opts.insert(name.into(), value);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend, BackendKind::Host);
        assert_eq!(config.base_opts.get("THREAD_BLOCK_SIZE"), Some(&32));
    }

    #[test]
    fn test_builder_rejects_zero_threads() {
        let result = Config::builder().queue_threads(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_bad_option_name() {
        let result = Config::builder().base_option("9LIVES", 1).build();
        assert!(result.is_err());

        let result = Config::builder().base_option("NEGATIVE", -1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_tuning() {
        let config = Config::builder()
            .multiply_dim_prod_worth_transfer(0)
            .tri_inverse_size_worth_transfer(7)
            .build()
            .unwrap();
        assert_eq!(config.tuning.multiply_dim_prod_worth_transfer, 0);
        assert_eq!(config.tuning.tri_inverse_size_worth_transfer, 7);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("THREAD_BLOCK_SIZE"));
        assert!(is_identifier("_X1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("A-B"));
    }
}

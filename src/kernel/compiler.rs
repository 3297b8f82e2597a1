//! JIT compilation of kernel source against a device context.

use crate::device::host::HostKernelFn;
use crate::device::{DeviceContext, Program};
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

/// Everything needed to build one named kernel.
#[derive(Clone, Copy)]
pub struct KernelSource<'a> {
    pub name: &'a str,
    /// Concatenated in order into one translation unit.
    pub fragments: &'a [&'a str],
    /// Implementation the host device runs in place of the source.
    pub host: Option<HostKernelFn>,
}

impl<'a> KernelSource<'a> {
    pub fn new(name: &'a str, fragments: &'a [&'a str]) -> Self {
        Self {
            name,
            fragments,
            host: None,
        }
    }

    pub fn with_host(mut self, host: HostKernelFn) -> Self {
        self.host = Some(host);
        self
    }

    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

impl fmt::Debug for KernelSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelSource")
            .field("name", &self.name)
            .field("fragments", &self.fragments.len())
            .field("host", &self.host.is_some())
            .finish()
    }
}

/// A built kernel: immutable and bound to the context that compiled it.
#[derive(Debug)]
pub struct CompiledKernel {
    name: String,
    options: Arc<BTreeMap<String, i32>>,
    program: Program,
}

impl CompiledKernel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The merged options the kernel was built with.
    pub fn options(&self) -> &BTreeMap<String, i32> {
        &self.options
    }

    pub(crate) fn shared_options(&self) -> &Arc<BTreeMap<String, i32>> {
        &self.options
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }
}

/// Merge requested options into the context defaults.
///
/// A requested key that has a default keeps the smaller of the two values,
/// so callers can lower a default but never raise it. Keys without a
/// default are added unchanged.
pub fn merge_options(
    base: &BTreeMap<String, i32>,
    requested: &BTreeMap<String, i32>,
) -> BTreeMap<String, i32> {
    let mut merged = base.clone();
    for (key, &value) in requested {
        merged
            .entry(key.clone())
            .and_modify(|default| *default = value.min(*default))
            .or_insert(value);
    }
    merged
}

/// Render options as ` -DNAME=VALUE` flags in key order.
pub fn render_options(options: &BTreeMap<String, i32>) -> String {
    let mut out = String::new();
    for (key, value) in options {
        let _ = write!(out, " -D{}={}", key, value);
    }
    out
}

/// Build `source` on the context's device with `requested` merged into
/// the context defaults. Nothing is cached here; see
/// [`DeviceContext::kernel`] for the per-context table.
pub fn compile(
    ctx: &DeviceContext,
    source: &KernelSource<'_>,
    requested: &BTreeMap<String, i32>,
) -> Result<CompiledKernel> {
    let options = merge_options(ctx.base_opts(), requested);
    let flags = render_options(&options);
    let start = Instant::now();

    let program = ctx
        .backend()
        .build(source.name, &source.text(), &flags, source.host)
        .inspect_err(|e| {
            tracing::warn!(kernel = source.name, error = %e, "kernel build failed");
        })?;

    ctx.metrics().record_kernel_compiled();
    tracing::debug!(
        kernel = source.name,
        options = %flags,
        elapsed_us = start.elapsed().as_micros() as u64,
        "kernel compiled"
    );

    Ok(CompiledKernel {
        name: source.name.to_string(),
        options: Arc::new(options),
        program,
    })
}

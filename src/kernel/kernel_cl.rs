//! Static kernel descriptors and the invocation adapter.

use super::arg::{ArgSpec, Direction, KernelArg};
use super::compiler::{CompiledKernel, KernelSource};
use super::range::NdRange;
use crate::device::{DeviceContext, Event, RawArg};
use crate::device::host::HostKernelFn;
use crate::error::{Error, Result};
use crate::matrix::MatrixCl;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A kernel known at compile time: its source, the options it asks for,
/// and the direction of every argument.
///
/// Built in `const` context so kernels live in `static`s:
///
/// ```ignore
/// static SCALE: KernelCl<3> = KernelCl::new("scale", &[SCALE_SRC], [IN_OUT_BUFFER, VALUE, VALUE])
///     .with_options(&[("THREAD_BLOCK_SIZE", 64)])
///     .with_host(scale_host);
/// ```
#[derive(Clone, Copy)]
pub struct KernelCl<const N: usize> {
    name: &'static str,
    sources: &'static [&'static str],
    options: &'static [(&'static str, i32)],
    signature: [ArgSpec; N],
    host: Option<HostKernelFn>,
}

impl<const N: usize> KernelCl<N> {
    pub const fn new(
        name: &'static str,
        sources: &'static [&'static str],
        signature: [ArgSpec; N],
    ) -> Self {
        Self {
            name,
            sources,
            options: &[],
            signature,
            host: None,
        }
    }

    pub const fn with_options(self, options: &'static [(&'static str, i32)]) -> Self {
        Self { options, ..self }
    }

    pub const fn with_host(self, host: HostKernelFn) -> Self {
        Self {
            host: Some(host),
            ..self
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> &[ArgSpec; N] {
        &self.signature
    }

    pub fn source(&self) -> KernelSource<'static> {
        KernelSource {
            name: self.name,
            fragments: self.sources,
            host: self.host,
        }
    }

    pub fn requested_options(&self) -> BTreeMap<String, i32> {
        self.options
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    /// The kernel as built for `ctx`, compiling it on first use.
    pub fn compiled(&self, ctx: &DeviceContext) -> Result<Arc<CompiledKernel>> {
        ctx.kernel(&self.source(), &self.requested_options())
    }

    /// Options the kernel was actually built with on `ctx`.
    pub fn options(&self, ctx: &DeviceContext) -> Result<BTreeMap<String, i32>> {
        Ok(self.compiled(ctx)?.options().clone())
    }

    /// Enqueue the kernel over `range`.
    ///
    /// The launch waits on the write events of every `In` buffer and on
    /// all events of every `Out`/`InOut` buffer, and its event is then
    /// recorded on each buffer according to its direction.
    pub fn invoke(
        &self,
        ctx: &DeviceContext,
        range: NdRange,
        args: [KernelArg<'_>; N],
    ) -> Result<Event> {
        let mut raw: Vec<RawArg<'_>> = Vec::with_capacity(N);
        for (i, (arg, spec)) in args.iter().zip(self.signature.iter()).enumerate() {
            let lowered = match (arg, spec) {
                (KernelArg::Matrix(m), ArgSpec::Buffer(dir)) => RawArg::Mem(m.memory(), *dir),
                (KernelArg::Int(v), ArgSpec::Value) => RawArg::Int(*v),
                (KernelArg::Double(v), ArgSpec::Value) => RawArg::Double(*v),
                _ => {
                    return Err(Error::invalid_argument(
                        self.name,
                        format!("argument {} expects {:?}, got {}", i, spec, arg.kind()),
                    ))
                }
            };
            raw.push(lowered);
        }
        range.validate(self.name)?;

        let kernel = self.compiled(ctx)?;

        let mut wait_list = Vec::new();
        for (arg, spec) in args.iter().zip(self.signature.iter()) {
            if let (KernelArg::Matrix(m), ArgSpec::Buffer(dir)) = (arg, spec) {
                wait_list.extend(dependencies(m, *dir));
            }
        }

        let event = ctx
            .backend()
            .enqueue(&kernel, &range, &raw, &wait_list)
            .inspect_err(|e| {
                tracing::warn!(kernel = self.name, error = %e, "kernel enqueue failed");
            })?;

        for (arg, spec) in args.iter().zip(self.signature.iter()) {
            if let (KernelArg::Matrix(m), ArgSpec::Buffer(dir)) = (arg, spec) {
                publish(m, *dir, &event);
            }
        }

        ctx.metrics().record_kernel_launch();
        tracing::trace!(
            kernel = self.name,
            global = ?range.global().as_slice(),
            waits = wait_list.len(),
            "kernel enqueued"
        );

        Ok(event)
    }
}

impl<const N: usize> std::fmt::Debug for KernelCl<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelCl")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("signature", &self.signature)
            .finish()
    }
}

/// Events a launch must wait on before touching `m` in direction `dir`.
fn dependencies(m: &MatrixCl, dir: Direction) -> Vec<Event> {
    match dir {
        Direction::In => m.write_events(),
        Direction::Out | Direction::InOut => m.read_write_events(),
    }
}

fn publish(m: &MatrixCl, dir: Direction, event: &Event) {
    match dir {
        Direction::In => m.add_read_event(event.clone()),
        Direction::Out => m.add_write_event(event.clone()),
        Direction::InOut => m.add_read_write_event(event.clone()),
    }
}

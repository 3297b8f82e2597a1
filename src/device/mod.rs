//! The single compute device a context dispatches to.

pub mod context;
pub mod event;
pub mod host;

#[cfg(feature = "opencl")]
pub mod opencl;

pub use context::DeviceContext;
pub use event::{wait_all, Event, HostEvent};
pub use host::{HostDevice, HostKernelFn, HostLaunch, HostMemory};

#[cfg(feature = "opencl")]
pub use opencl::ClDevice;

use crate::config::BackendKind;
use crate::error::{Error, Result};
use crate::kernel::{CompiledKernel, Direction, NdRange};
use host::HostProgram;

/// Static facts about the selected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub backend: BackendKind,
    pub max_work_group_size: usize,
    pub compute_units: usize,
}

/// Memory owned by one device buffer.
#[derive(Debug)]
pub enum DeviceMemory {
    Host(HostMemory),

    #[cfg(feature = "opencl")]
    Cl(ocl::Buffer<f64>),
}

impl DeviceMemory {
    /// Allocated length in elements.
    pub fn len(&self) -> usize {
        match self {
            DeviceMemory::Host(m) => m.len(),
            #[cfg(feature = "opencl")]
            DeviceMemory::Cl(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn as_host(&self) -> Option<&HostMemory> {
        match self {
            DeviceMemory::Host(m) => Some(m),
            #[cfg(feature = "opencl")]
            _ => None,
        }
    }

    #[cfg(feature = "opencl")]
    pub(crate) fn as_cl(&self) -> Option<&ocl::Buffer<f64>> {
        match self {
            DeviceMemory::Cl(b) => Some(b),
            _ => None,
        }
    }
}

/// A built program as the owning backend represents it.
#[derive(Debug)]
pub(crate) enum Program {
    Host(HostProgram),

    #[cfg(feature = "opencl")]
    Cl(ocl::Program),
}

/// A kernel argument after lowering to device terms.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RawArg<'a> {
    Mem(&'a DeviceMemory, Direction),
    Int(i32),
    Double(f64),
}

#[derive(Debug)]
pub(crate) enum Backend {
    Host(HostDevice),

    #[cfg(feature = "opencl")]
    OpenCl(ClDevice),
}

impl Backend {
    pub(crate) fn kind(&self) -> BackendKind {
        match self {
            Backend::Host(_) => BackendKind::Host,
            #[cfg(feature = "opencl")]
            Backend::OpenCl(_) => BackendKind::OpenCl,
        }
    }

    pub(crate) fn info(&self) -> DeviceInfo {
        match self {
            Backend::Host(d) => DeviceInfo {
                name: d.name(),
                backend: self.kind(),
                max_work_group_size: d.max_work_group_size(),
                compute_units: d.compute_units(),
            },
            #[cfg(feature = "opencl")]
            Backend::OpenCl(d) => d.info(),
        }
    }

    pub(crate) fn build(
        &self,
        kernel: &str,
        source: &str,
        options: &str,
        host_fn: Option<HostKernelFn>,
    ) -> Result<Program> {
        match self {
            Backend::Host(d) => d.build(kernel, source, options, host_fn).map(Program::Host),
            #[cfg(feature = "opencl")]
            Backend::OpenCl(d) => d.build(kernel, source, options).map(Program::Cl),
        }
    }

    /// Allocate at least one element, zero-filled.
    pub(crate) fn alloc(&self, len: usize) -> Result<DeviceMemory> {
        match self {
            Backend::Host(d) => Ok(DeviceMemory::Host(d.alloc(len))),
            #[cfg(feature = "opencl")]
            Backend::OpenCl(d) => d.alloc(len).map(DeviceMemory::Cl),
        }
    }

    pub(crate) fn write(&self, mem: &DeviceMemory, data: Vec<f64>, wait_list: &[Event]) -> Result<Event> {
        match (self, mem) {
            (Backend::Host(d), DeviceMemory::Host(m)) => d.write(m, data, wait_list),
            #[cfg(feature = "opencl")]
            (Backend::OpenCl(d), DeviceMemory::Cl(b)) => d.write(b, &data, wait_list),
            #[allow(unreachable_patterns)]
            _ => Err(foreign_memory()),
        }
    }

    pub(crate) fn read(&self, mem: &DeviceMemory, len: usize, wait_list: &[Event]) -> Result<Vec<f64>> {
        match (self, mem) {
            (Backend::Host(d), DeviceMemory::Host(m)) => d.read(m, len, wait_list),
            #[cfg(feature = "opencl")]
            (Backend::OpenCl(d), DeviceMemory::Cl(b)) => d.read(b, len, wait_list),
            #[allow(unreachable_patterns)]
            _ => Err(foreign_memory()),
        }
    }

    pub(crate) fn enqueue(
        &self,
        kernel: &CompiledKernel,
        range: &NdRange,
        args: &[RawArg<'_>],
        wait_list: &[Event],
    ) -> Result<Event> {
        match (self, kernel.program()) {
            (Backend::Host(d), Program::Host(p)) => d.enqueue(
                kernel.name(),
                p,
                kernel.shared_options(),
                range,
                args,
                wait_list,
            ),
            #[cfg(feature = "opencl")]
            (Backend::OpenCl(d), Program::Cl(p)) => d.enqueue(kernel.name(), p, range, args, wait_list),
            #[allow(unreachable_patterns)]
            _ => Err(Error::device(format!(
                "kernel `{}` was built for another device",
                kernel.name()
            ))),
        }
    }

    pub(crate) fn finish(&self) -> Result<()> {
        match self {
            Backend::Host(d) => {
                d.finish();
                Ok(())
            }
            #[cfg(feature = "opencl")]
            Backend::OpenCl(d) => d.finish(),
        }
    }
}

fn foreign_memory() -> Error {
    Error::device("buffer belongs to another device")
}

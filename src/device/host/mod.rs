//! In-process device backend.
//!
//! Buffers live in host memory, kernel source is checked by a front-end
//! compiler and each kernel name is bound to a Rust implementation, and
//! commands run on an out-of-order worker queue ordered only by events.

mod compiler;
mod launch;
mod queue;

pub use launch::{HostKernelFn, HostLaunch};

pub(crate) use launch::HostArg;

use self::queue::HostQueue;
use super::event::{Event, HostEvent};
use super::RawArg;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::kernel::NdRange;
use crate::telemetry::Metrics;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Device memory of the host backend.
#[derive(Clone)]
pub struct HostMemory(Arc<RwLock<Vec<f64>>>);

impl HostMemory {
    pub(crate) fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0.0; len])
    }

    pub(crate) fn from_vec(data: Vec<f64>) -> Self {
        Self(Arc::new(RwLock::new(data)))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<f64>> {
        // recursive so one launch may read the same buffer through two slots
        self.0.read_recursive()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<f64>> {
        self.0.write()
    }

    pub(crate) fn same_as(&self, other: &HostMemory) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMemory").field("len", &self.len()).finish()
    }
}

/// A kernel that passed the front-end and has a host implementation bound.
#[derive(Clone)]
pub(crate) struct HostProgram {
    pub(crate) func: HostKernelFn,
    pub(crate) kernel_names: Vec<String>,
}

impl fmt::Debug for HostProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostProgram")
            .field("kernel_names", &self.kernel_names)
            .finish()
    }
}

pub struct HostDevice {
    queue: HostQueue,
    max_work_group_size: usize,
    metrics: Arc<Metrics>,
}

impl HostDevice {
    pub(crate) fn new(config: &Config, metrics: Arc<Metrics>) -> Result<Self> {
        let queue = HostQueue::new(
            config.worker_threads(),
            &config.thread_name_prefix,
            metrics.clone(),
        )?;

        Ok(Self {
            queue,
            max_work_group_size: config.max_work_group_size,
            metrics,
        })
    }

    pub fn name(&self) -> String {
        format!("host ({} queue threads)", self.queue.num_threads())
    }

    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    pub fn compute_units(&self) -> usize {
        self.queue.num_threads()
    }

    /// Front-end compile `source`, then bind `kernel` to `host_fn`.
    pub(crate) fn build(
        &self,
        kernel: &str,
        source: &str,
        options: &str,
        host_fn: Option<HostKernelFn>,
    ) -> Result<HostProgram> {
        let kernel_names =
            compiler::build(source, options).map_err(|log| Error::kernel_build(kernel, log))?;

        if !kernel_names.iter().any(|n| n == kernel) {
            return Err(Error::kernel_not_found(kernel));
        }

        let func = host_fn.ok_or_else(|| {
            Error::kernel_build(
                kernel,
                format!(
                    "<link>: error: no host implementation bound for kernel `{}`\n",
                    kernel
                ),
            )
        })?;

        Ok(HostProgram { func, kernel_names })
    }

    pub(crate) fn alloc(&self, len: usize) -> HostMemory {
        HostMemory::zeroed(len.max(1))
    }

    /// Enqueue a copy of `data` into `mem`.
    pub(crate) fn write(&self, mem: &HostMemory, data: Vec<f64>, wait_list: &[Event]) -> Result<Event> {
        let waits = host_events(wait_list)?;
        let target = mem.clone();
        let bytes = data.len() * std::mem::size_of::<f64>();

        let event = self.queue.submit(
            "write_buffer",
            waits,
            Box::new(move || {
                let mut dst = target.write();
                if data.len() > dst.len() {
                    return Err(Error::device(format!(
                        "write of {} elements overflows buffer of {}",
                        data.len(),
                        dst.len()
                    )));
                }
                dst[..data.len()].copy_from_slice(&data);
                Ok(())
            }),
        );
        self.metrics.record_transfer_to_device(bytes);
        Ok(event.into())
    }

    /// Enqueue a read of the first `len` elements of `mem` and block for it.
    pub(crate) fn read(&self, mem: &HostMemory, len: usize, wait_list: &[Event]) -> Result<Vec<f64>> {
        let waits = host_events(wait_list)?;
        let source = mem.clone();
        let slot: Arc<parking_lot::Mutex<Vec<f64>>> = Arc::default();
        let out = slot.clone();

        let event = self.queue.submit(
            "read_buffer",
            waits,
            Box::new(move || {
                let src = source.read();
                let data = src.get(..len).ok_or_else(|| {
                    Error::device(format!(
                        "read of {} elements overruns buffer of {}",
                        len,
                        src.len()
                    ))
                })?;
                *out.lock() = data.to_vec();
                Ok(())
            }),
        );
        event.wait()?;

        self.metrics
            .record_transfer_from_device(len * std::mem::size_of::<f64>());
        let data = std::mem::take(&mut *slot.lock());
        Ok(data)
    }

    pub(crate) fn enqueue(
        &self,
        kernel: &str,
        program: &HostProgram,
        options: &Arc<BTreeMap<String, i32>>,
        range: &NdRange,
        args: &[RawArg<'_>],
        wait_list: &[Event],
    ) -> Result<Event> {
        let waits = host_events(wait_list)?;
        let host_args = host_args(kernel, args)?;

        let func = program.func;
        let name = kernel.to_string();
        let options = options.clone();
        let range = range.clone();

        let event = self.queue.submit(
            kernel,
            waits,
            Box::new(move || {
                let launch = HostLaunch::new(&name, &host_args, &options, &range);
                func(&launch)
            }),
        );
        Ok(event.into())
    }

    pub(crate) fn finish(&self) {
        self.queue.finish();
    }
}

impl fmt::Debug for HostDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDevice")
            .field("threads", &self.queue.num_threads())
            .field("max_work_group_size", &self.max_work_group_size)
            .finish()
    }
}

fn host_events(wait_list: &[Event]) -> Result<Vec<HostEvent>> {
    wait_list
        .iter()
        .map(|e| match e {
            Event::Host(h) => Ok(h.clone()),
            #[allow(unreachable_patterns)]
            _ => Err(Error::device("host queue cannot wait on a foreign event")),
        })
        .collect()
}

/// Lower raw arguments, rejecting a buffer bound twice when either binding writes.
fn host_args(kernel: &str, args: &[RawArg<'_>]) -> Result<Vec<HostArg>> {
    let mut lowered: Vec<HostArg> = Vec::with_capacity(args.len());

    for (i, arg) in args.iter().enumerate() {
        let host_arg = match arg {
            RawArg::Mem(mem, dir) => {
                let mem = mem.as_host().ok_or_else(|| {
                    Error::device(format!("{}: argument {} is not host memory", kernel, i))
                })?;
                for (j, prev) in lowered.iter().enumerate() {
                    if let HostArg::Mem(other, other_dir) = prev {
                        if other.same_as(mem) && (dir.writes() || other_dir.writes()) {
                            return Err(Error::invalid_argument(
                                kernel,
                                format!("arguments {} and {} alias the same buffer", j, i),
                            ));
                        }
                    }
                }
                HostArg::Mem(mem.clone(), *dir)
            }
            RawArg::Int(v) => HostArg::Int(*v),
            RawArg::Double(v) => HostArg::Double(*v),
        };
        lowered.push(host_arg);
    }

    Ok(lowered)
}

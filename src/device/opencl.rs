//! OpenCL device backend over the `ocl` crate.

use super::{DeviceInfo, Event, RawArg};
use crate::config::{BackendKind, Config};
use crate::error::{Error, Result};
use crate::kernel::NdRange;
use crate::telemetry::Metrics;
use ocl::core::Status;
use ocl::enums::{DeviceInfo as ClInfo, ProgramInfo};
use ocl::flags::CommandQueueProperties;
use ocl::{Buffer, Context, Device, EventList, Kernel, Platform, Program, Queue};
use std::sync::Arc;

pub struct ClDevice {
    context: Context,
    device: Device,
    queue: Queue,
    info: DeviceInfo,
    metrics: Arc<Metrics>,
}

impl ClDevice {
    pub(crate) fn new(config: &Config, metrics: Arc<Metrics>) -> Result<Self> {
        let platforms = Platform::list();
        let platform = *platforms.get(config.platform_index).ok_or_else(|| {
            Error::device(format!(
                "OpenCL platform {} not found ({} available)",
                config.platform_index,
                platforms.len()
            ))
        })?;

        let devices = Device::list_all(platform)?;
        let device = *devices.get(config.device_index).ok_or_else(|| {
            Error::device(format!(
                "OpenCL device {} not found on platform {} ({} available)",
                config.device_index,
                config.platform_index,
                devices.len()
            ))
        })?;

        let extensions = device.info(ClInfo::Extensions)?.to_string();
        if !extensions.contains("cl_khr_fp64") {
            return Err(Error::device(format!(
                "device `{}` lacks double precision support",
                device.name()?
            )));
        }

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()?;

        let queue = match Queue::new(
            &context,
            device,
            Some(CommandQueueProperties::new().out_of_order()),
        ) {
            Ok(q) => q,
            Err(e) => {
                tracing::debug!(error = %e, "out-of-order queue unsupported, using in-order");
                Queue::new(&context, device, None)?
            }
        };

        let compute_units = device
            .info(ClInfo::MaxComputeUnits)?
            .to_string()
            .parse()
            .unwrap_or(1);
        let info = DeviceInfo {
            name: device.name()?,
            backend: BackendKind::OpenCl,
            max_work_group_size: device.max_wg_size()?,
            compute_units,
        };

        Ok(Self {
            context,
            device,
            queue,
            info,
            metrics,
        })
    }

    pub fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    pub(crate) fn build(&self, kernel: &str, source: &str, options: &str) -> Result<Program> {
        if source.contains('\0') || options.contains('\0') {
            return Err(Error::device(format!(
                "{}: kernel source or options contain a NUL byte",
                kernel
            )));
        }

        let program = Program::builder()
            .src(source)
            .devices(self.device)
            .cmplr_opt(options)
            .build(&self.context)
            .map_err(|e| build_error(kernel, e.api_status(), e))?;

        let names = program.info(ProgramInfo::KernelNames)?.to_string();
        if !names.split(';').any(|n| n.trim() == kernel) {
            return Err(Error::kernel_not_found(kernel));
        }

        Ok(program)
    }

    pub(crate) fn alloc(&self, len: usize) -> Result<Buffer<f64>> {
        let buffer = Buffer::<f64>::builder()
            .queue(self.queue.clone())
            .len(len.max(1))
            .fill_val(0.0)
            .build()?;
        Ok(buffer)
    }

    pub(crate) fn write(&self, buffer: &Buffer<f64>, data: &[f64], wait_list: &[Event]) -> Result<Event> {
        let waits = cl_events(wait_list)?;

        if data.is_empty() {
            let marker = self.queue.enqueue_marker(Some(&waits))?;
            return Ok(Event::Cl(marker));
        }

        // the staging buffer copies `data` at creation, so the device-side
        // copy can run after this returns; the runtime keeps it alive
        // until the copy completes
        let staging = Buffer::<f64>::builder()
            .queue(self.queue.clone())
            .len(data.len())
            .copy_host_slice(data)
            .build()?;

        let mut event = ocl::Event::empty();
        staging
            .cmd()
            .copy(buffer, None, None)
            .ewait(&waits)
            .enew(&mut event)
            .enq()?;

        self.metrics
            .record_transfer_to_device(std::mem::size_of_val(data));
        Ok(Event::Cl(event))
    }

    pub(crate) fn read(&self, buffer: &Buffer<f64>, len: usize, wait_list: &[Event]) -> Result<Vec<f64>> {
        let waits = cl_events(wait_list)?;
        if len == 0 {
            waits.wait_for()?;
            return Ok(Vec::new());
        }

        let mut out = vec![0.0; len];
        buffer.read(&mut out).ewait(&waits).len(len).enq()?;

        self.metrics
            .record_transfer_from_device(len * std::mem::size_of::<f64>());
        Ok(out)
    }

    pub(crate) fn enqueue(
        &self,
        name: &str,
        program: &Program,
        range: &NdRange,
        args: &[RawArg<'_>],
        wait_list: &[Event],
    ) -> Result<Event> {
        let waits = cl_events(wait_list)?;

        let mut builder = Kernel::builder();
        builder
            .program(program)
            .name(name)
            .queue(self.queue.clone())
            .global_work_size(range.global().to_spatial());
        if let Some(local) = range.local() {
            builder.local_work_size(local.to_spatial());
        }

        for (i, arg) in args.iter().enumerate() {
            match arg {
                RawArg::Mem(mem, _) => {
                    let buffer = mem.as_cl().ok_or_else(|| {
                        Error::device(format!("{}: argument {} is not an OpenCL buffer", name, i))
                    })?;
                    builder.arg(buffer);
                }
                RawArg::Int(v) => {
                    builder.arg(v);
                }
                RawArg::Double(v) => {
                    builder.arg(v);
                }
            }
        }

        let kernel = builder.build()?;
        let mut event = ocl::Event::empty();
        unsafe {
            kernel.cmd().ewait(&waits).enew(&mut event).enq()?;
        }

        Ok(Event::Cl(event))
    }

    pub(crate) fn finish(&self) -> Result<()> {
        self.queue.finish()?;
        Ok(())
    }
}

impl std::fmt::Debug for ClDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClDevice").field("info", &self.info).finish()
    }
}

/// Only a failed compilation carries a build log; every other status is a
/// device fault. A missing status is the program-build error `ocl` raises
/// after fetching the log.
fn build_error(kernel: &str, status: Option<Status>, e: ocl::Error) -> Error {
    match status {
        Some(Status::CL_BUILD_PROGRAM_FAILURE) | None => Error::kernel_build(kernel, e.to_string()),
        Some(_) => Error::from(e),
    }
}

fn cl_events(wait_list: &[Event]) -> Result<EventList> {
    let events = wait_list
        .iter()
        .map(|e| match e {
            Event::Cl(ev) => Ok(ev.clone()),
            Event::Host(_) => Err(Error::device("OpenCL queue cannot wait on a host event")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(EventList::from(events))
}

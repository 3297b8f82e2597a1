//! clmath - dense linear algebra with event-ordered device offload
//!
//! Kernels are carried as source, compiled on first use against a
//! [`DeviceContext`], and invoked through static descriptors that declare
//! how each buffer argument is accessed. Every [`MatrixCl`] tracks the
//! events of the launches touching it, so conflicting launches run in
//! order without a global lock. Dispatch sites such as [`fun::multiply`]
//! stay on the host until the problem is large enough to pay for the
//! transfers.
//!
//! # Quick Start
//!
//! ```no_run
//! use clmath::prelude::*;
//! use nalgebra::DMatrix;
//!
//! let ctx = DeviceContext::new(Config::default()).unwrap();
//! ctx.tuning_mut().multiply_dim_prod_worth_transfer = 0;
//!
//! let a = DMatrix::<f64>::identity(64, 64);
//! let b = DMatrix::<f64>::from_element(64, 8, 2.0);
//! let c = multiply(&ctx, &a, &b).unwrap();
//! assert_eq!(c, b);
//! ```
//!
//! # Backends
//!
//! - **host** (default): in-process device with an out-of-order worker queue
//! - **opencl** (feature `opencl`): any OpenCL 1.2 device with `cl_khr_fp64`

#![warn(missing_debug_implementations)]

pub mod check;
pub mod config;
pub mod device;
pub mod error;
pub mod fun;
pub mod kernel;
pub mod kernels;
pub mod matrix;
pub mod prelude;
pub mod runtime;
pub mod telemetry;
pub mod util;

pub use config::{BackendKind, Config, ConfigBuilder, TuningOpts};
pub use device::{DeviceContext, Event};
pub use error::{Error, Result};
pub use matrix::{MatrixCl, TriView};
pub use runtime::{init, init_with_config, shutdown};

//! Kernel signatures, compilation and invocation.

pub mod arg;
pub mod compiler;
pub mod kernel_cl;
pub mod range;

pub use arg::{cl_int, ArgSpec, Direction, KernelArg, IN_BUFFER, IN_OUT_BUFFER, OUT_BUFFER, VALUE};
pub use compiler::{compile, merge_options, render_options, CompiledKernel, KernelSource};
pub use kernel_cl::KernelCl;
pub use range::{round_up, NdRange, WorkSize};

use crate::error::{Error, Result};
use crate::matrix::MatrixCl;

/// How a kernel accesses one buffer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read-only.
    In,
    /// Write-only.
    Out,
    /// Read and written.
    InOut,
}

impl Direction {
    pub const fn reads(self) -> bool {
        !matches!(self, Direction::Out)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Direction::In)
    }
}

/// One position of a kernel's static signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSpec {
    Buffer(Direction),
    /// Scalar passed by value (`int` or `double`).
    Value,
}

pub const IN_BUFFER: ArgSpec = ArgSpec::Buffer(Direction::In);
pub const OUT_BUFFER: ArgSpec = ArgSpec::Buffer(Direction::Out);
pub const IN_OUT_BUFFER: ArgSpec = ArgSpec::Buffer(Direction::InOut);
pub const VALUE: ArgSpec = ArgSpec::Value;

/// A call-site argument for [`KernelCl::invoke`](super::KernelCl::invoke).
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    Matrix(&'a MatrixCl),
    Int(i32),
    Double(f64),
}

impl KernelArg<'_> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            KernelArg::Matrix(_) => "matrix",
            KernelArg::Int(_) => "int",
            KernelArg::Double(_) => "double",
        }
    }
}

impl<'a> From<&'a MatrixCl> for KernelArg<'a> {
    fn from(m: &'a MatrixCl) -> Self {
        KernelArg::Matrix(m)
    }
}

impl From<i32> for KernelArg<'_> {
    fn from(v: i32) -> Self {
        KernelArg::Int(v)
    }
}

impl From<f64> for KernelArg<'_> {
    fn from(v: f64) -> Self {
        KernelArg::Double(v)
    }
}

/// Convert a dimension to the `int` kernels take, rejecting overflow.
pub fn cl_int(function: &str, n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| {
        Error::invalid_argument(function, format!("dimension {} exceeds the int range", n))
    })
}

//! What a host kernel implementation sees when it runs.

use super::HostMemory;
use crate::error::{Error, Result};
use crate::kernel::{Direction, NdRange};
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Host implementation bound to a kernel name.
///
/// Runs once per launch on a queue worker and covers the whole ND-range.
pub type HostKernelFn = fn(&HostLaunch<'_>) -> Result<()>;

#[derive(Debug, Clone)]
pub(crate) enum HostArg {
    Mem(HostMemory, Direction),
    Int(i32),
    Double(f64),
}

/// Arguments, compile options and range of one host kernel launch.
#[derive(Debug)]
pub struct HostLaunch<'a> {
    kernel: &'a str,
    args: &'a [HostArg],
    options: &'a Arc<BTreeMap<String, i32>>,
    range: &'a NdRange,
}

impl<'a> HostLaunch<'a> {
    pub(crate) fn new(
        kernel: &'a str,
        args: &'a [HostArg],
        options: &'a Arc<BTreeMap<String, i32>>,
        range: &'a NdRange,
    ) -> Self {
        Self {
            kernel,
            args,
            options,
            range,
        }
    }

    pub fn kernel(&self) -> &str {
        self.kernel
    }

    pub fn range(&self) -> &NdRange {
        self.range
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// Read access to buffer argument `index`.
    pub fn read(&self, index: usize) -> Result<RwLockReadGuard<'_, Vec<f64>>> {
        match self.arg(index)? {
            HostArg::Mem(mem, _) => Ok(mem.read()),
            _ => Err(self.wrong_kind(index, "buffer")),
        }
    }

    /// Write access to buffer argument `index`. Fails for `In` arguments.
    pub fn write(&self, index: usize) -> Result<RwLockWriteGuard<'_, Vec<f64>>> {
        match self.arg(index)? {
            HostArg::Mem(mem, dir) if dir.writes() => Ok(mem.write()),
            HostArg::Mem(..) => Err(Error::device(format!(
                "{}: argument {} is read-only",
                self.kernel, index
            ))),
            _ => Err(self.wrong_kind(index, "buffer")),
        }
    }

    pub fn int(&self, index: usize) -> Result<i32> {
        match self.arg(index)? {
            HostArg::Int(v) => Ok(*v),
            _ => Err(self.wrong_kind(index, "int")),
        }
    }

    /// Integer argument `index` as a size; negative values are a device fault.
    pub fn usize(&self, index: usize) -> Result<usize> {
        let v = self.int(index)?;
        usize::try_from(v).map_err(|_| {
            Error::device(format!(
                "{}: argument {} must be non-negative, got {}",
                self.kernel, index, v
            ))
        })
    }

    pub fn double(&self, index: usize) -> Result<f64> {
        match self.arg(index)? {
            HostArg::Double(v) => Ok(*v),
            _ => Err(self.wrong_kind(index, "double")),
        }
    }

    /// Value of a `-D` option the kernel was compiled with.
    pub fn option(&self, name: &str) -> Result<i32> {
        self.options.get(name).copied().ok_or_else(|| {
            Error::device(format!("{}: macro `{}` is not defined", self.kernel, name))
        })
    }

    fn arg(&self, index: usize) -> Result<&HostArg> {
        self.args.get(index).ok_or_else(|| {
            Error::device(format!(
                "{}: argument {} out of range ({} given)",
                self.kernel,
                index,
                self.args.len()
            ))
        })
    }

    fn wrong_kind(&self, index: usize, expected: &str) -> Error {
        Error::device(format!(
            "{}: argument {} is not a {}",
            self.kernel, index, expected
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_accessors() {
        let mem = HostMemory::from_vec(vec![1.0, 2.0]);
        let args = vec![
            HostArg::Mem(mem.clone(), Direction::In),
            HostArg::Mem(HostMemory::zeroed(2), Direction::Out),
            HostArg::Int(-3),
            HostArg::Double(0.5),
        ];
        let options = Arc::new(BTreeMap::from([("TILE".to_string(), 4)]));
        let range = NdRange::new(2usize);
        let launch = HostLaunch::new("k", &args, &options, &range);

        assert_eq!(launch.read(0).unwrap()[1], 2.0);
        assert!(launch.write(0).is_err());
        launch.write(1).unwrap()[0] = 9.0;
        assert_eq!(launch.int(2).unwrap(), -3);
        assert!(launch.usize(2).is_err());
        assert_eq!(launch.double(3).unwrap(), 0.5);
        assert!(launch.int(3).is_err());
        assert!(launch.read(7).is_err());
        assert_eq!(launch.option("TILE").unwrap(), 4);
        assert!(launch.option("MISSING").is_err());
    }
}

use crate::error::{Error, Result};

/// Prepended to every kernel source.
pub const FP64_PRAGMA: &str = "#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n";

/// Fail unless `buf` holds at least `needed` elements.
pub(crate) fn ensure_len(kernel: &str, what: &str, buf: &[f64], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(Error::device(format!(
            "{}: {} holds {} elements, kernel touches {}",
            kernel,
            what,
            buf.len(),
            needed
        )));
    }
    Ok(())
}

use super::helpers::{ensure_len, FP64_PRAGMA};
use crate::device::HostLaunch;
use crate::error::Result;
use crate::kernel::{KernelCl, IN_BUFFER, OUT_BUFFER, VALUE};

const SOURCE: &str = r#"
// B (cols x rows) = transpose of A (rows x cols), both column-major.
__kernel void transpose(__global double* B,
                        const __global double* A,
                        const int rows,
                        const int cols) {
    const int i = get_global_id(0);
    const int j = get_global_id(1);
    if (i < rows && j < cols) {
        B[i * cols + j] = A[j * rows + i];
    }
}
"#;

/// Arguments: `B`, `A`, `rows(A)`, `cols(A)`.
pub static TRANSPOSE: KernelCl<4> = KernelCl::new(
    "transpose",
    &[FP64_PRAGMA, SOURCE],
    [OUT_BUFFER, IN_BUFFER, VALUE, VALUE],
)
.with_host(transpose_host);

fn transpose_host(launch: &HostLaunch<'_>) -> Result<()> {
    let (rows, cols) = (launch.usize(2)?, launch.usize(3)?);
    let a = launch.read(1)?;
    let mut b = launch.write(0)?;

    ensure_len(launch.kernel(), "A", &a, rows * cols)?;
    ensure_len(launch.kernel(), "B", &b, rows * cols)?;

    for j in 0..cols {
        for i in 0..rows {
            b[i * cols + j] = a[j * rows + i];
        }
    }
    Ok(())
}

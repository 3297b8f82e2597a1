//! Inverse of a lower-triangular matrix by forward substitution.
//!
//! Only the lower triangle of the input is read. Each work-item solves
//! `L x = e_j` for one column `j` of the inverse.

use super::helpers::{ensure_len, FP64_PRAGMA};
use crate::device::HostLaunch;
use crate::error::Result;
use crate::kernel::{KernelCl, IN_BUFFER, OUT_BUFFER, VALUE};

const SOURCE: &str = r#"
#define A(i, j) A[(j) * N + (i)]
#define inv(i, j) inv[(j) * N + (i)]

__kernel void lower_tri_inverse(const __global double* A,
                                __global double* inv,
                                const int N) {
    const int j = get_global_id(0);
    if (j >= N) {
        return;
    }

    for (int i = 0; i < j; i++) {
        inv(i, j) = 0.0;
    }
    inv(j, j) = 1.0 / A(j, j);
    for (int i = j + 1; i < N; i++) {
        double sum = 0.0;
        for (int k = j; k < i; k++) {
            sum += A(i, k) * inv(k, j);
        }
        inv(i, j) = -sum / A(i, i);
    }
}
"#;

/// Arguments: `A`, `inv`, `N`.
pub static LOWER_TRI_INVERSE: KernelCl<3> = KernelCl::new(
    "lower_tri_inverse",
    &[FP64_PRAGMA, SOURCE],
    [IN_BUFFER, OUT_BUFFER, VALUE],
)
.with_host(lower_tri_inverse_host);

fn lower_tri_inverse_host(launch: &HostLaunch<'_>) -> Result<()> {
    let n = launch.usize(2)?;
    let a = launch.read(0)?;
    let mut inv = launch.write(1)?;

    ensure_len(launch.kernel(), "A", &a, n * n)?;
    ensure_len(launch.kernel(), "inv", &inv, n * n)?;

    for j in 0..n {
        for i in 0..j {
            inv[j * n + i] = 0.0;
        }
        inv[j * n + j] = 1.0 / a[j * n + j];
        for i in (j + 1)..n {
            let sum: f64 = (j..i).map(|k| a[k * n + i] * inv[j * n + k]).sum();
            inv[j * n + i] = -sum / a[i * n + i];
        }
    }
    Ok(())
}

//! `C = A * B` over column-major buffers, tiled in local memory.

use super::helpers::{ensure_len, FP64_PRAGMA};
use crate::device::HostLaunch;
use crate::error::Result;
use crate::kernel::{KernelCl, IN_BUFFER, OUT_BUFFER, VALUE};

const SOURCE: &str = r#"
#define A(i, j) A[(j) * M + (i)]
#define B(i, j) B[(j) * K + (i)]
#define C(i, j) C[(j) * M + (i)]

// A is M x K, B is K x N, C is M x N. One work-item per element of C.
__kernel void matrix_multiply(const __global double* A,
                              const __global double* B,
                              __global double* C,
                              const int M,
                              const int N,
                              const int K) {
    const int row = get_local_id(0);
    const int col = get_local_id(1);
    const int i = THREAD_BLOCK_SIZE * get_group_id(0) + row;
    const int j = THREAD_BLOCK_SIZE * get_group_id(1) + col;

    __local double A_local[THREAD_BLOCK_SIZE][THREAD_BLOCK_SIZE];
    __local double B_local[THREAD_BLOCK_SIZE][THREAD_BLOCK_SIZE];

    double acc = 0.0;
    const int num_tiles = (K + THREAD_BLOCK_SIZE - 1) / THREAD_BLOCK_SIZE;
    for (int t = 0; t < num_tiles; t++) {
        const int tiled_i = THREAD_BLOCK_SIZE * t + row;
        const int tiled_j = THREAD_BLOCK_SIZE * t + col;
        A_local[col][row] = (i < M && tiled_j < K) ? A(i, tiled_j) : 0.0;
        B_local[col][row] = (tiled_i < K && j < N) ? B(tiled_i, j) : 0.0;
        barrier(CLK_LOCAL_MEM_FENCE);

        for (int k = 0; k < THREAD_BLOCK_SIZE; k++) {
            acc += A_local[k][row] * B_local[col][k];
        }
        barrier(CLK_LOCAL_MEM_FENCE);
    }

    if (i < M && j < N) {
        C(i, j) = acc;
    }
}
"#;

/// Arguments: `A`, `B`, `C`, `M`, `N`, `K`.
pub static MATRIX_MULTIPLY: KernelCl<6> = KernelCl::new(
    "matrix_multiply",
    &[FP64_PRAGMA, SOURCE],
    [IN_BUFFER, IN_BUFFER, OUT_BUFFER, VALUE, VALUE, VALUE],
)
.with_options(&[("THREAD_BLOCK_SIZE", 32)])
.with_host(matrix_multiply_host);

fn matrix_multiply_host(launch: &HostLaunch<'_>) -> Result<()> {
    let (m, n, k) = (launch.usize(3)?, launch.usize(4)?, launch.usize(5)?);
    let a = launch.read(0)?;
    let b = launch.read(1)?;
    let mut c = launch.write(2)?;

    ensure_len(launch.kernel(), "A", &a, m * k)?;
    ensure_len(launch.kernel(), "B", &b, k * n)?;
    ensure_len(launch.kernel(), "C", &c, m * n)?;

    for j in 0..n {
        let c_col = &mut c[j * m..(j + 1) * m];
        c_col.fill(0.0);
        for p in 0..k {
            let b_pj = b[j * k + p];
            if b_pj == 0.0 {
                continue;
            }
            let a_col = &a[p * m..(p + 1) * m];
            for (c_ij, a_ip) in c_col.iter_mut().zip(a_col) {
                *c_ij += a_ip * b_pj;
            }
        }
    }

    Ok(())
}

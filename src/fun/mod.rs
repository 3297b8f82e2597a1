//! Dispatch sites: host-facing functions that move work to the device
//! once the problem is large enough to pay for the transfers.

mod mdivide_left_tri;
mod multiply;

pub use mdivide_left_tri::{mdivide_left_tri, mdivide_left_tri_inverse};
pub use multiply::{dot_row_col, multiply, multiply_scalar};

/// Whether a problem of `problem_size` should run on the device.
#[inline]
pub fn should_offload(problem_size: usize, threshold: usize) -> bool {
    problem_size > threshold
}

//! Kernels shipped with the crate.

mod helpers;
mod matrix_multiply;
mod transpose;
mod tri_inverse;

pub use helpers::FP64_PRAGMA;
pub use matrix_multiply::MATRIX_MULTIPLY;
pub use transpose::TRANSPOSE;
pub use tri_inverse::LOWER_TRI_INVERSE;

//! Device matrices and the operations defined on them.

mod matrix_cl;
pub mod ops;

pub use matrix_cl::MatrixCl;

/// Which part of a matrix an operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriView {
    Entire,
    Lower,
    Upper,
}

//! Argument validation shared by the dispatch sites.
//!
//! Shapes are passed as `(rows, cols)` so the same checks serve host
//! matrices and [`MatrixCl`](crate::matrix::MatrixCl).

use crate::error::{Error, Result};
use nalgebra::DMatrix;

pub fn check_size_match(
    function: &str,
    name_i: &str,
    i: usize,
    name_j: &str,
    j: usize,
) -> Result<()> {
    if i != j {
        return Err(Error::shape_mismatch(
            function,
            format!("{} ({}) and {} ({}) must match in size", name_i, i, name_j, j),
        ));
    }
    Ok(())
}

/// `cols(x1)` must equal `rows(x2)`. Empty operands are allowed.
pub fn check_multiplicable(
    function: &str,
    name1: &str,
    shape1: (usize, usize),
    name2: &str,
    shape2: (usize, usize),
) -> Result<()> {
    check_size_match(
        function,
        &format!("Columns of {}", name1),
        shape1.1,
        &format!("Rows of {}", name2),
        shape2.0,
    )
}

pub fn check_square(function: &str, name: &str, shape: (usize, usize)) -> Result<()> {
    if shape.0 != shape.1 {
        return Err(Error::shape_mismatch(
            function,
            format!(
                "Expecting a square matrix; rows of {} ({}) and columns of {} ({}) must match in size",
                name, shape.0, name, shape.1
            ),
        ));
    }
    Ok(())
}

/// Either one row or one column.
pub fn check_vector(function: &str, name: &str, shape: (usize, usize)) -> Result<()> {
    if shape.0 == 1 || shape.1 == 1 {
        return Ok(());
    }
    Err(Error::invalid_argument(
        function,
        format!(
            "{} has {} rows and {} columns but it should be a vector so it should either have 1 row or 1 column",
            name, shape.0, shape.1
        ),
    ))
}

/// Every diagonal entry of the square matrix `x` must be non-zero.
pub fn check_nonzero_diagonal(function: &str, name: &str, x: &DMatrix<f64>) -> Result<()> {
    if let Some(i) = (0..x.nrows().min(x.ncols())).find(|&i| x[(i, i)] == 0.0) {
        return Err(Error::invalid_argument(
            function,
            format!("{} is singular: diagonal element {} is zero", name, i),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_match() {
        assert!(check_size_match("f", "a", 3, "b", 3).is_ok());
        let err = check_size_match("f", "a", 3, "b", 4).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(err.to_string(), "f: a (3) and b (4) must match in size");
    }

    #[test]
    fn test_multiplicable_allows_empty() {
        assert!(check_multiplicable("f", "A", (0, 0), "B", (0, 5)).is_ok());
        assert!(check_multiplicable("f", "A", (2, 3), "B", (3, 0)).is_ok());
        assert!(check_multiplicable("f", "A", (2, 3), "B", (2, 3)).is_err());
    }

    #[test]
    fn test_square_and_vector() {
        assert!(check_square("f", "A", (0, 0)).is_ok());
        assert!(check_square("f", "A", (2, 3)).is_err());

        assert!(check_vector("f", "v", (1, 7)).is_ok());
        assert!(check_vector("f", "v", (7, 1)).is_ok());
        assert!(matches!(
            check_vector("f", "v", (2, 2)),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_nonzero_diagonal() {
        let ok = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 5.0, 7.0]);
        assert!(check_nonzero_diagonal("f", "A", &ok).is_ok());

        let singular = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 5.0, 0.0]);
        assert!(check_nonzero_diagonal("f", "A", &singular).is_err());
    }
}

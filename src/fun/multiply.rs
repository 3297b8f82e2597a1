use super::should_offload;
use crate::check::{check_multiplicable, check_size_match, check_vector};
use crate::device::DeviceContext;
use crate::error::Result;
use crate::matrix::{ops, MatrixCl};
use nalgebra::DMatrix;

/// Matrix product `m1 * m2`.
///
/// Runs on the device when `rows(m1) * cols(m1) * cols(m2)` exceeds the
/// context's `multiply_dim_prod_worth_transfer`, on the host otherwise.
/// Shapes are checked before anything is transferred, and any empty
/// operand yields a `rows(m1) x cols(m2)` zero matrix.
pub fn multiply(ctx: &DeviceContext, m1: &DMatrix<f64>, m2: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_multiplicable("multiply", "m1", m1.shape(), "m2", m2.shape())?;

    if m1.is_empty() || m2.is_empty() {
        return Ok(DMatrix::zeros(m1.nrows(), m2.ncols()));
    }

    let dim_prod = m1
        .nrows()
        .saturating_mul(m1.ncols())
        .saturating_mul(m2.ncols());
    let threshold = ctx.tuning().multiply_dim_prod_worth_transfer;
    let offload = should_offload(dim_prod, threshold);

    ctx.metrics().record_dispatch(offload);
    tracing::debug!(dim_prod, threshold, offload, "multiply");

    if offload {
        let m1_cl = MatrixCl::from_host(ctx, m1)?;
        let m2_cl = MatrixCl::from_host(ctx, m2)?;
        let m3_cl = ops::multiply(ctx, &m1_cl, &m2_cl)?;
        m3_cl.to_host(ctx)
    } else {
        Ok(m1 * m2)
    }
}

pub fn multiply_scalar(m: &DMatrix<f64>, c: f64) -> DMatrix<f64> {
    m * c
}

/// Product of a row vector and a column vector, i.e. their dot product.
pub fn dot_row_col(rv: &DMatrix<f64>, v: &DMatrix<f64>) -> Result<f64> {
    check_vector("multiply", "rv", rv.shape())?;
    check_vector("multiply", "v", v.shape())?;
    check_size_match("multiply", "Size of rv", rv.len(), "Size of v", v.len())?;

    Ok(rv.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Error;

    fn ctx(threshold: usize) -> DeviceContext {
        let config = Config::builder()
            .queue_threads(2)
            .multiply_dim_prod_worth_transfer(threshold)
            .build()
            .unwrap();
        DeviceContext::new(config).unwrap()
    }

    #[test]
    fn test_small_product_stays_on_host() {
        let ctx = ctx(1_000);
        let a = DMatrix::from_element(2, 2, 1.0);
        let c = multiply(&ctx, &a, &a).unwrap();

        assert_eq!(c, DMatrix::from_element(2, 2, 2.0));
        assert_eq!(ctx.compiled_kernels(), 0);
    }

    #[test]
    fn test_large_product_is_offloaded() {
        let ctx = ctx(0);
        let a = DMatrix::from_element(2, 2, 1.0);
        let c = multiply(&ctx, &a, &a).unwrap();

        assert_eq!(c, DMatrix::from_element(2, 2, 2.0));
        assert_eq!(ctx.compiled_kernels(), 1);
    }

    #[test]
    fn test_shape_checked_before_transfer() {
        let ctx = ctx(0);
        let a = DMatrix::<f64>::zeros(2, 3);
        let err = multiply(&ctx, &a, &a).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(ctx.compiled_kernels(), 0);
    }

    #[test]
    fn test_empty_operands() {
        let ctx = ctx(0);
        let c = multiply(&ctx, &DMatrix::zeros(3, 0), &DMatrix::zeros(0, 4)).unwrap();
        assert_eq!(c, DMatrix::zeros(3, 4));

        let c = multiply(&ctx, &DMatrix::zeros(0, 0), &DMatrix::zeros(0, 0)).unwrap();
        assert_eq!(c.shape(), (0, 0));
    }

    #[test]
    fn test_scalar_and_vector_products() {
        let m = DMatrix::from_element(2, 3, 1.5);
        assert_eq!(multiply_scalar(&m, 2.0), DMatrix::from_element(2, 3, 3.0));

        let rv = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);
        let v = DMatrix::from_column_slice(3, 1, &[4.0, 5.0, 6.0]);
        assert_eq!(dot_row_col(&rv, &v).unwrap(), 32.0);

        let short = DMatrix::from_column_slice(2, 1, &[1.0, 1.0]);
        assert!(dot_row_col(&rv, &short).is_err());
        assert!(dot_row_col(&DMatrix::zeros(2, 2), &v).is_err());
    }
}

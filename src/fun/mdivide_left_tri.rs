use super::should_offload;
use crate::check::{check_multiplicable, check_nonzero_diagonal, check_square};
use crate::device::DeviceContext;
use crate::error::{Error, Result};
use crate::matrix::{ops, MatrixCl, TriView};
use nalgebra::DMatrix;

/// Solve `A x = b` where `A` is triangular in the `view` half.
///
/// Offloads when `rows(A)` exceeds `tri_inverse_size_worth_transfer`: the
/// device inverts `A` and multiplies the inverse into `b`.
pub fn mdivide_left_tri(
    ctx: &DeviceContext,
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    view: TriView,
) -> Result<DMatrix<f64>> {
    const FUNCTION: &str = "mdivide_left_tri";
    check_square(FUNCTION, "A", a.shape())?;
    check_multiplicable(FUNCTION, "A", a.shape(), "b", b.shape())?;
    if a.nrows() == 0 || b.ncols() == 0 {
        return Ok(DMatrix::zeros(a.nrows(), b.ncols()));
    }
    check_triangular_view(FUNCTION, view)?;
    check_nonzero_diagonal(FUNCTION, "A", a)?;

    if offload(ctx, FUNCTION, a.nrows()) {
        let a_cl = MatrixCl::from_host(ctx, a)?;
        let inv_cl = ops::tri_inverse(ctx, &a_cl, view)?;
        let b_cl = MatrixCl::from_host(ctx, b)?;
        ops::multiply(ctx, &inv_cl, &b_cl)?.to_host(ctx)
    } else {
        host_solve(FUNCTION, a, b, view)
    }
}

/// Inverse of the triangular matrix `A`, with the same dispatch rule as
/// [`mdivide_left_tri`].
pub fn mdivide_left_tri_inverse(
    ctx: &DeviceContext,
    a: &DMatrix<f64>,
    view: TriView,
) -> Result<DMatrix<f64>> {
    const FUNCTION: &str = "mdivide_left_tri_inverse";
    check_square(FUNCTION, "A", a.shape())?;
    if a.nrows() == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }
    check_triangular_view(FUNCTION, view)?;
    check_nonzero_diagonal(FUNCTION, "A", a)?;

    if offload(ctx, FUNCTION, a.nrows()) {
        let a_cl = MatrixCl::from_host(ctx, a)?;
        ops::tri_inverse(ctx, &a_cl, view)?.to_host(ctx)
    } else {
        let identity = DMatrix::identity(a.nrows(), a.nrows());
        host_solve(FUNCTION, a, &identity, view)
    }
}

fn offload(ctx: &DeviceContext, function: &str, n: usize) -> bool {
    let threshold = ctx.tuning().tri_inverse_size_worth_transfer;
    let offload = should_offload(n, threshold);

    ctx.metrics().record_dispatch(offload);
    tracing::debug!(function, n, threshold, offload, "triangular solve");
    offload
}

fn check_triangular_view(function: &str, view: TriView) -> Result<()> {
    match view {
        TriView::Lower | TriView::Upper => Ok(()),
        TriView::Entire => Err(Error::invalid_argument(
            function,
            "matrix must be lower or upper triangular",
        )),
    }
}

fn host_solve(function: &str, a: &DMatrix<f64>, b: &DMatrix<f64>, view: TriView) -> Result<DMatrix<f64>> {
    let solved = match view {
        TriView::Lower => a.solve_lower_triangular(b),
        _ => a.solve_upper_triangular(b),
    };
    solved.ok_or_else(|| Error::invalid_argument(function, "A is singular"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use approx::assert_relative_eq;

    fn ctx(threshold: usize) -> DeviceContext {
        let config = Config::builder()
            .queue_threads(2)
            .tri_inverse_size_worth_transfer(threshold)
            .build()
            .unwrap();
        DeviceContext::new(config).unwrap()
    }

    #[test]
    fn test_lower_and_upper_values() {
        for threshold in [100, 0] {
            let ctx = ctx(threshold);
            let identity = DMatrix::<f64>::identity(2, 2);

            let lower = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 5.0, 7.0]);
            let x = mdivide_left_tri(&ctx, &lower, &lower, TriView::Lower).unwrap();
            assert_relative_eq!(x, identity, epsilon = 1e-12);

            let inv = mdivide_left_tri_inverse(&ctx, &lower, TriView::Lower).unwrap();
            assert_relative_eq!(&lower * inv, identity, epsilon = 1e-12);

            let upper = DMatrix::from_row_slice(2, 2, &[2.0, 3.0, 0.0, 7.0]);
            let x = mdivide_left_tri(&ctx, &upper, &upper, TriView::Upper).unwrap();
            assert_relative_eq!(x, identity, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_size_zero() {
        let ctx = ctx(0);
        let a = DMatrix::<f64>::zeros(0, 0);
        let b0 = DMatrix::<f64>::zeros(0, 2);

        for view in [TriView::Lower, TriView::Upper] {
            assert_eq!(mdivide_left_tri(&ctx, &a, &a, view).unwrap().shape(), (0, 0));
            assert_eq!(mdivide_left_tri_inverse(&ctx, &a, view).unwrap().shape(), (0, 0));
            assert_eq!(mdivide_left_tri(&ctx, &a, &b0, view).unwrap().shape(), (0, 2));
        }
    }

    #[test]
    fn test_empty_right_hand_side_stays_on_host() {
        let ctx = ctx(0);
        let a = DMatrix::<f64>::identity(5, 5) * 3.0;
        let b = DMatrix::<f64>::zeros(5, 0);

        let x = mdivide_left_tri(&ctx, &a, &b, TriView::Lower).unwrap();
        assert_eq!(x.shape(), (5, 0));

        let snapshot = ctx.metrics().snapshot();
        assert_eq!(snapshot.device_dispatches, 0);
        assert_eq!(snapshot.bytes_to_device, 0);
        assert_eq!(ctx.compiled_kernels(), 0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let ctx = ctx(100);
        let rect = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            mdivide_left_tri(&ctx, &rect, &rect, TriView::Lower),
            Err(Error::ShapeMismatch { .. })
        ));

        let a = DMatrix::<f64>::identity(2, 2);
        let b = DMatrix::<f64>::zeros(3, 1);
        assert!(matches!(
            mdivide_left_tri(&ctx, &a, &b, TriView::Lower),
            Err(Error::ShapeMismatch { .. })
        ));

        assert!(mdivide_left_tri_inverse(&ctx, &a, TriView::Entire).is_err());

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 3.0, 0.0]);
        assert!(matches!(
            mdivide_left_tri_inverse(&ctx, &singular, TriView::Lower),
            Err(Error::InvalidArgument { .. })
        ));
    }
}

//! Device-side operations composed from the built-in kernels.

use super::{MatrixCl, TriView};
use crate::check::{check_multiplicable, check_square};
use crate::device::DeviceContext;
use crate::error::{Error, Result};
use crate::kernel::{cl_int, round_up, NdRange};
use crate::kernels::{LOWER_TRI_INVERSE, MATRIX_MULTIPLY, TRANSPOSE};

/// `a * b` on the device.
pub fn multiply(ctx: &DeviceContext, a: &MatrixCl, b: &MatrixCl) -> Result<MatrixCl> {
    check_multiplicable("multiply", "A", (a.rows(), a.cols()), "B", (b.rows(), b.cols()))?;

    let c = MatrixCl::zeros(ctx, a.rows(), b.cols())?;
    if a.is_empty() || b.is_empty() {
        return Ok(c);
    }

    let tbs = thread_block_size(ctx)?;
    let range = NdRange::new((round_up(a.rows(), tbs), round_up(b.cols(), tbs))).with_local((tbs, tbs));

    MATRIX_MULTIPLY.invoke(
        ctx,
        range,
        [
            a.into(),
            b.into(),
            (&c).into(),
            cl_int("multiply", a.rows())?.into(),
            cl_int("multiply", b.cols())?.into(),
            cl_int("multiply", a.cols())?.into(),
        ],
    )?;
    Ok(c)
}

pub fn transpose(ctx: &DeviceContext, a: &MatrixCl) -> Result<MatrixCl> {
    let b = MatrixCl::zeros(ctx, a.cols(), a.rows())?;
    if a.is_empty() {
        return Ok(b);
    }

    TRANSPOSE.invoke(
        ctx,
        NdRange::new((a.rows(), a.cols())),
        [
            (&b).into(),
            a.into(),
            cl_int("transpose", a.rows())?.into(),
            cl_int("transpose", a.cols())?.into(),
        ],
    )?;
    Ok(b)
}

/// Inverse of the `view` triangle of `a`. Upper triangles are inverted as
/// the transpose of the lower inverse of the transpose.
pub fn tri_inverse(ctx: &DeviceContext, a: &MatrixCl, view: TriView) -> Result<MatrixCl> {
    check_square("tri_inverse", "A", (a.rows(), a.cols()))?;

    match view {
        TriView::Lower => lower_tri_inverse(ctx, a),
        TriView::Upper => {
            let lower = transpose(ctx, a)?;
            let inv = lower_tri_inverse(ctx, &lower)?;
            transpose(ctx, &inv)
        }
        TriView::Entire => Err(Error::invalid_argument(
            "tri_inverse",
            "matrix must be lower or upper triangular",
        )),
    }
}

fn lower_tri_inverse(ctx: &DeviceContext, a: &MatrixCl) -> Result<MatrixCl> {
    let inv = MatrixCl::zeros(ctx, a.rows(), a.cols())?;
    if a.is_empty() {
        return Ok(inv);
    }

    LOWER_TRI_INVERSE.invoke(
        ctx,
        NdRange::new(a.rows()),
        [a.into(), (&inv).into(), cl_int("tri_inverse", a.rows())?.into()],
    )?;
    Ok(inv)
}

fn thread_block_size(ctx: &DeviceContext) -> Result<usize> {
    let options = MATRIX_MULTIPLY.compiled(ctx)?;
    let tbs = options.options().get("THREAD_BLOCK_SIZE").copied().unwrap_or(1);
    Ok(usize::try_from(tbs).unwrap_or(1).max(1))
}

use std::ops::{AddAssign, Mul};

use super::BatchPlan;
use crate::view::ShapeView;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Accumulator scalar of the inner product loop.
pub trait Accumulator: Copy + Default + Send + Sync + AddAssign + Mul<Output = Self> {}

impl Accumulator for f32 {}
impl Accumulator for i64 {}

/// Lossless conversion of an operand element into the accumulator type.
///
/// 8-bit operands widen to `i64` so that a reduction of any length cannot
/// wrap inside the accumulator.
pub trait Widen<Acc>: Copy + Send + Sync {
    fn widen(self) -> Acc;
}

impl Widen<f32> for f32 {
    #[inline(always)]
    fn widen(self) -> f32 {
        self
    }
}

impl Widen<i64> for i8 {
    #[inline(always)]
    fn widen(self) -> i64 {
        self as i64
    }
}

impl Widen<i64> for u8 {
    #[inline(always)]
    fn widen(self) -> i64 {
        self as i64
    }
}

/// Strided batched GEMM: `C[b] = X[b] · Y[b]` over views of the operand
/// buffers.
///
/// `C` is contiguous with shape `plan.output_dims()`. Each output row is an
/// independent unit of work.
pub fn gemm_strided<A, B, Acc>(
    plan: &BatchPlan,
    x: &[A],
    xv: &ShapeView,
    y: &[B],
    yv: &ShapeView,
) -> Vec<Acc>
where
    A: Widen<Acc>,
    B: Widen<Acc>,
    Acc: Accumulator,
{
    let mut c = vec![Acc::default(); plan.output_len()];

    #[cfg(feature = "parallel")]
    {
        c.par_chunks_mut(plan.n)
            .enumerate()
            .for_each(|(row, c_row)| compute_row(plan, row, c_row, x, xv, y, yv));
    }

    #[cfg(not(feature = "parallel"))]
    {
        c.chunks_mut(plan.n)
            .enumerate()
            .for_each(|(row, c_row)| compute_row(plan, row, c_row, x, xv, y, yv));
    }

    c
}

/// Fill output row `row` (flattened over batches) of `C`.
#[inline]
fn compute_row<A, B, Acc>(
    plan: &BatchPlan,
    row: usize,
    c_row: &mut [Acc],
    x: &[A],
    xv: &ShapeView,
    y: &[B],
    yv: &ShapeView,
) where
    A: Widen<Acc>,
    B: Widen<Acc>,
    Acc: Accumulator,
{
    let batch = row / plan.m;
    let i = row % plan.m;

    // Unbatched views have no batch axes, so their offset is always 0.
    let x_row = xv.batch_offset(batch) + i * xv.row_stride();
    let y_base = yv.batch_offset(batch);
    let (x_step, y_step) = (xv.col_stride(), yv.row_stride());

    for (j, out) in c_row.iter_mut().enumerate() {
        let y_col = y_base + j * yv.col_stride();
        let mut acc = Acc::default();
        for p in 0..plan.k {
            acc += x[x_row + p * x_step].widen() * y[y_col + p * y_step].widen();
        }
        *out = acc;
    }
}

use crate::core::{gemm_strided, BatchPlan, MatmulConfig, MatmulConfigBuilder, Widen};
use crate::error::{GemmError, Result};
use crate::quant::narrow_accumulator;
use crate::types::{DType, Shape, Storage, Tensor};
use crate::view::ShapeView;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Batched matrix multiplication: `Out = alpha · op(X) · op(Y)`
///
/// `op` folds the operand through its fused reshape and permutation, then
/// swaps the matrix axes when `transpose_X`/`transpose_Y` is set. Leading
/// axes are batch axes; an operand without them is shared across the other
/// operand's batches.
///
/// | X, Y | Scales | Output |
/// |------|--------|--------|
/// | `f32`, `f32` | ignored | `f32` |
/// | `i8`/`u8`, `i8`/`u8` | `Scale_x` and `Scale_y` | `i8` with `Scale_out`, else `f32` |
/// | `i8`/`u8`, `i8`/`u8` | either missing | raw accumulator, saturated `i8` (or `f32` if forced) |
///
/// # Errors
///
/// - [`GemmError::ShapeMismatch`] / [`GemmError::InvalidDescriptor`] for
///   descriptors inconsistent with the operand
/// - [`GemmError::RankError`] when an operand resolves to a single axis
/// - [`GemmError::DimensionMismatch`] when X columns differ from Y rows
/// - [`GemmError::BatchMismatch`] when both operands have differing batch axes
/// - [`GemmError::DtypeMismatch`] when `f32` is mixed with an integer type
///
/// # Example
///
/// ```
/// use quant_gemm::{matmul, MatmulConfig, Tensor};
///
/// let x = Tensor::from_f32([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let y = Tensor::from_f32([3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
///
/// let out = matmul(&x, &y, &MatmulConfig::default()).unwrap();
/// assert_eq!(out.dims(), &[2, 2]);
/// assert_eq!(out.as_f32().unwrap(), &[22.0, 28.0, 49.0, 64.0]);
/// ```
pub fn matmul(x: &Tensor, y: &Tensor, config: &MatmulConfig) -> Result<Tensor> {
    let xv = resolve_operand(
        x,
        config.fused_reshape_x(),
        config.fused_transpose_x(),
        config.transpose_x(),
    )?;
    let yv = resolve_operand(
        y,
        config.fused_reshape_y(),
        config.fused_transpose_y(),
        config.transpose_y(),
    )?;
    let plan = BatchPlan::new(&xv, &yv)?;
    let out_shape = Shape::new(plan.output_dims());

    log::debug!(
        "matmul: {} x {} -> {} (m={}, n={}, k={}, batch={})",
        x.dtype(),
        y.dtype(),
        out_shape,
        plan.m,
        plan.n,
        plan.k,
        plan.batch_size()
    );

    match (x.storage(), y.storage()) {
        (Storage::F32(a), Storage::F32(b)) => {
            let mut c: Vec<f32> = gemm_strided(&plan, a, &xv, b, &yv);
            let alpha = config.alpha();
            if alpha != 1.0 {
                c.iter_mut().for_each(|v| *v *= alpha);
            }
            Tensor::from_storage(out_shape, Storage::F32(c))
        }
        (Storage::I8(a), Storage::I8(b)) => integer_product(&plan, a, &xv, b, &yv, out_shape, config),
        (Storage::I8(a), Storage::U8(b)) => integer_product(&plan, a, &xv, b, &yv, out_shape, config),
        (Storage::U8(a), Storage::I8(b)) => integer_product(&plan, a, &xv, b, &yv, out_shape, config),
        (Storage::U8(a), Storage::U8(b)) => integer_product(&plan, a, &xv, b, &yv, out_shape, config),
        (Storage::F32(_), other) | (other, Storage::F32(_)) => Err(GemmError::DtypeMismatch {
            expected: "operands of the same numeric family (f32 x f32 or 8-bit x 8-bit)"
                .to_string(),
            actual: other.dtype(),
        }),
    }
}

fn resolve_operand(
    tensor: &Tensor,
    reshape: &[i64],
    transpose: &[usize],
    swap: bool,
) -> Result<ShapeView> {
    let view = ShapeView::resolve(tensor, reshape, transpose)?;
    Ok(if swap { view.swap_matrix_axes() } else { view })
}

fn integer_product<A, B>(
    plan: &BatchPlan,
    a: &[A],
    xv: &ShapeView,
    b: &[B],
    yv: &ShapeView,
    out_shape: Shape,
    config: &MatmulConfig,
) -> Result<Tensor>
where
    A: Widen<i64>,
    B: Widen<i64>,
{
    let acc: Vec<i64> = gemm_strided(plan, a, xv, b, yv);

    match config.dequantizer() {
        Some(dequantizer) => {
            log::trace!("matmul: dequantizing to {}", dequantizer.output_dtype());
            dequantizer.apply(&acc, out_shape)
        }
        None => {
            log::debug!(
                "matmul: integer operands without Scale_x/Scale_y, returning raw accumulator as {}",
                if config.force_fp32_output() {
                    DType::F32
                } else {
                    DType::I8
                }
            );
            narrow_accumulator(&acc, out_shape, config.alpha(), config.force_fp32_output())
        }
    }
}

/// One-shot builder over [`matmul`].
///
/// # Example
///
/// ```
/// use quant_gemm::{Matmul, Tensor};
///
/// let x = Tensor::from_f32([3, 2], vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).unwrap();
/// let y = Tensor::from_f32([3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
///
/// let out = Matmul::new().trans_x().alpha(0.5).execute(&x, &y).unwrap();
/// assert_eq!(out.as_f32().unwrap(), &[11.0, 14.0, 24.5, 32.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Matmul {
    config: MatmulConfigBuilder,
}

impl Matmul {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transpose X.
    pub fn trans_x(mut self) -> Self {
        self.config = self.config.transpose_x();
        self
    }

    /// Transpose Y.
    pub fn trans_y(mut self) -> Self {
        self.config = self.config.transpose_y();
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.config = self.config.alpha(alpha);
        self
    }

    /// Dequantize integer operands with the given scales.
    pub fn scales(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.config = self.config.scale_x(scale_x).scale_y(scale_y);
        self
    }

    /// Validate the configuration and run the product.
    pub fn execute(self, x: &Tensor, y: &Tensor) -> Result<Tensor> {
        matmul(x, y, &self.config.build()?)
    }
}

/// Run independent products that share one configuration.
///
/// Stops at the first failing pair.
pub fn matmul_batched(pairs: &[(Tensor, Tensor)], config: &MatmulConfig) -> Result<Vec<Tensor>> {
    #[cfg(feature = "parallel")]
    {
        pairs
            .par_iter()
            .map(|(x, y)| matmul(x, y, config))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        pairs.iter().map(|(x, y)| matmul(x, y, config)).collect()
    }
}

/// Gradients of [`matmul`]. The kernel is inference-only.
///
/// # Errors
///
/// Always returns [`GemmError::UnsupportedOperation`].
pub fn matmul_backward(
    _x: &Tensor,
    _y: &Tensor,
    _grad_out: &Tensor,
    _config: &MatmulConfig,
) -> Result<(Tensor, Tensor)> {
    Err(GemmError::UnsupportedOperation(
        "matmul has no gradient kernel".to_string(),
    ))
}

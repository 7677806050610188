use super::{QuantScale, Signedness};
use crate::error::{GemmError, Result};
use crate::types::{DType, Shape, Storage, Tensor};

/// `round(scale * value)` clipped to the target range. Ties round to even.
#[inline]
pub fn quantize_value(value: f32, scale: f32, signedness: Signedness) -> f32 {
    (value * scale)
        .round_ties_even()
        .clamp(signedness.min_level(), signedness.max_level())
}

/// Quantize an `f32` tensor to `i8`.
///
/// # Example
///
/// ```
/// use quant_gemm::{derive_scale, quantize, Tensor};
///
/// let t = Tensor::from_f32([3], vec![127.0, -127.0, 0.0]).unwrap();
/// let q = quantize(&t, derive_scale(&t).unwrap()).unwrap();
/// assert_eq!(q.as_i8().unwrap(), &[127, -127, 0]);
/// ```
pub fn quantize(tensor: &Tensor, scale: QuantScale) -> Result<Tensor> {
    let s = scale.value();
    let data = tensor
        .as_f32()?
        .iter()
        .map(|&v| quantize_value(v, s, Signedness::Signed) as i8)
        .collect();
    Tensor::from_storage(tensor.shape().clone(), Storage::I8(data))
}

/// Quantize an `f32` tensor to `u8`; negative values clip to zero.
pub fn quantize_unsigned(tensor: &Tensor, scale: QuantScale) -> Result<Tensor> {
    let s = scale.value();
    let data = tensor
        .as_f32()?
        .iter()
        .map(|&v| quantize_value(v, s, Signedness::Unsigned) as u8)
        .collect();
    Tensor::from_storage(tensor.shape().clone(), Storage::U8(data))
}

/// Map an `i8`/`u8` tensor back to `f32` by dividing by `scale`.
pub fn dequantize(tensor: &Tensor, scale: QuantScale) -> Result<Tensor> {
    let s = scale.value();
    let data = match tensor.storage() {
        Storage::I8(v) => v.iter().map(|&q| q as f32 / s).collect(),
        Storage::U8(v) => v.iter().map(|&q| q as f32 / s).collect(),
        Storage::F32(_) => {
            return Err(GemmError::DtypeMismatch {
                expected: "i8 or u8".to_string(),
                actual: DType::F32,
            })
        }
    };
    Tensor::from_storage(tensor.shape().clone(), Storage::F32(data))
}

/// Converts an `i64` product accumulator of two quantized operands into the
/// output tensor.
///
/// The accumulator is divided by `scale_x * scale_y` and multiplied by
/// `alpha`. With an output scale (and `force_fp32_output` unset) the result
/// is re-quantized to `i8`, otherwise it is returned as `f32`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dequantizer {
    scale_x: QuantScale,
    scale_y: QuantScale,
    scale_out: Option<QuantScale>,
    force_fp32_output: bool,
    alpha: f32,
}

impl Dequantizer {
    pub fn new(scale_x: QuantScale, scale_y: QuantScale) -> Self {
        Self {
            scale_x,
            scale_y,
            scale_out: None,
            force_fp32_output: false,
            alpha: 1.0,
        }
    }

    pub fn scale_out(mut self, scale_out: Option<QuantScale>) -> Self {
        self.scale_out = scale_out;
        self
    }

    pub fn force_fp32_output(mut self, force: bool) -> Self {
        self.force_fp32_output = force;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Scale used for re-quantization, if the output stays integer.
    fn requantize_scale(&self) -> Option<QuantScale> {
        if self.force_fp32_output {
            None
        } else {
            self.scale_out
        }
    }

    pub fn output_dtype(&self) -> DType {
        match self.requantize_scale() {
            Some(_) => DType::I8,
            None => DType::F32,
        }
    }

    pub fn apply(&self, acc: &[i64], shape: Shape) -> Result<Tensor> {
        let factor =
            self.alpha as f64 / (self.scale_x.value() as f64 * self.scale_y.value() as f64);
        let descale = |q: i64| (q as f64 * factor) as f32;

        let storage = match self.requantize_scale() {
            Some(out) => {
                let s = out.value();
                Storage::I8(
                    acc.iter()
                        .map(|&q| quantize_value(descale(q), s, Signedness::Signed) as i8)
                        .collect(),
                )
            }
            None => Storage::F32(acc.iter().map(|&q| descale(q)).collect()),
        };
        Tensor::from_storage(shape, storage)
    }
}

/// Output of an integer product with no usable scales.
///
/// The accumulator is multiplied by `alpha` and either saturated to
/// `[-127, 127]` as `i8` or returned as `f32` when `force_fp32_output` is
/// set. No descaling happens.
pub fn narrow_accumulator(
    acc: &[i64],
    shape: Shape,
    alpha: f32,
    force_fp32_output: bool,
) -> Result<Tensor> {
    let storage = if force_fp32_output {
        Storage::F32(acc.iter().map(|&q| q as f32 * alpha).collect())
    } else {
        Storage::I8(
            acc.iter()
                .map(|&q| quantize_value(q as f32, alpha, Signedness::Signed) as i8)
                .collect(),
        )
    };
    Tensor::from_storage(shape, storage)
}

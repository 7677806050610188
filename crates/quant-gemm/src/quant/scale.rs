use crate::error::{GemmError, Result};
use crate::types::{DType, Element, Storage, Tensor};

/// Target integer range of a quantized tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signedness {
    /// `i8`, clipped to `[-127, 127]`.
    #[default]
    Signed,
    /// `u8`, clipped to `[0, 255]`.
    Unsigned,
}

impl Signedness {
    pub const fn min_level(self) -> f32 {
        match self {
            Signedness::Signed => -127.0,
            Signedness::Unsigned => 0.0,
        }
    }

    /// Largest representable level; also the numerator of derived scales.
    pub const fn max_level(self) -> f32 {
        match self {
            Signedness::Signed => 127.0,
            Signedness::Unsigned => 255.0,
        }
    }

    pub const fn dtype(self) -> DType {
        match self {
            Signedness::Signed => DType::I8,
            Signedness::Unsigned => DType::U8,
        }
    }
}

/// Multiplier mapping real values onto integer levels: `q = round(scale * x)`.
///
/// Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantScale(f32);

impl QuantScale {
    pub fn new(value: f32) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(GemmError::InvalidConfig(format!(
                "quantization scale must be positive and finite, got {}",
                value
            )))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for QuantScale {
    type Error = GemmError;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}

/// Signed scale `127 / max(|tensor|)`.
///
/// # Example
///
/// ```
/// use quant_gemm::{derive_scale, Tensor};
///
/// let t = Tensor::from_f32([3], vec![127.0, -127.0, 0.0]).unwrap();
/// assert_eq!(derive_scale(&t).unwrap().value(), 1.0);
/// ```
pub fn derive_scale(tensor: &Tensor) -> Result<QuantScale> {
    derive_scale_for(tensor, Signedness::Signed)
}

/// Scale `max_level / max(|tensor|)` for the given target range.
pub fn derive_scale_for(tensor: &Tensor, signedness: Signedness) -> Result<QuantScale> {
    let max_abs = match tensor.storage() {
        Storage::F32(v) => max_abs(v),
        Storage::I8(v) => max_abs(v),
        Storage::U8(v) => max_abs(v),
    };
    if max_abs == 0.0 {
        return Err(GemmError::DegenerateTensor);
    }
    QuantScale::new(signedness.max_level() / max_abs)
}

fn max_abs<T: Element>(data: &[T]) -> f32 {
    data.iter().fold(0.0f32, |m, &x| m.max(x.to_f32().abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_validation() {
        assert!(QuantScale::new(0.5).is_ok());
        assert!(QuantScale::new(0.0).is_err());
        assert!(QuantScale::new(-1.0).is_err());
        assert!(QuantScale::new(f32::NAN).is_err());
        assert!(QuantScale::try_from(f32::INFINITY).is_err());
    }

    #[test]
    fn test_derive_scale_uses_magnitude() {
        let t = Tensor::from_f32([3], vec![0.5, -2.0, 1.0]).unwrap();
        assert_eq!(derive_scale(&t).unwrap().value(), 63.5);
    }

    #[test]
    fn test_derive_unsigned_scale() {
        let t = Tensor::from_f32([2], vec![0.0, 5.1]).unwrap();
        let s = derive_scale_for(&t, Signedness::Unsigned).unwrap();
        assert!((s.value() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_derive_from_integer_tensor() {
        let t = Tensor::from_i8([2], vec![-127, 3]).unwrap();
        assert_eq!(derive_scale(&t).unwrap().value(), 1.0);
    }

    #[test]
    fn test_all_zero_is_degenerate() {
        let t = Tensor::from_f32([2, 2], vec![0.0; 4]).unwrap();
        assert_eq!(derive_scale(&t).unwrap_err(), GemmError::DegenerateTensor);
    }
}

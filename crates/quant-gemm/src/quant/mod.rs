//! Linear 8-bit quantization.
//!
//! A real value `x` maps to the integer level `q = round(scale * x)`, clipped
//! to `[-127, 127]` for `i8` or `[0, 255]` for `u8`. The inverse is
//! `x ≈ q / scale`.
//!
//! For a product of two quantized operands the `i64` accumulator carries the
//! factor `scale_x * scale_y`:
//!
//! ```text
//! acc[i,j]  = Σ_k qx[i,k] · qy[k,j]           (i64, never i8)
//! out[i,j]  = alpha · acc[i,j] / (scale_x · scale_y)
//! out_q     = round(scale_out · out[i,j])     (only when scale_out is set)
//! ```
//!
//! # Example
//!
//! ```rust
//! use quant_gemm::quant::{dequantize, derive_scale, quantize};
//! use quant_gemm::Tensor;
//!
//! let t = Tensor::from_f32([4], vec![0.1, -0.4, 0.25, 0.0]).unwrap();
//! let s = derive_scale(&t).unwrap();
//! let back = dequantize(&quantize(&t, s).unwrap(), s).unwrap();
//! for (a, b) in t.as_f32().unwrap().iter().zip(back.as_f32().unwrap()) {
//!     assert!((a - b).abs() <= 1.0 / s.value());
//! }
//! ```

mod codec;
mod scale;

pub use codec::{
    dequantize, narrow_accumulator, quantize, quantize_unsigned, quantize_value, Dequantizer,
};
pub use scale::{derive_scale, derive_scale_for, QuantScale, Signedness};

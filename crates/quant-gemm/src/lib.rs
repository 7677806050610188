//! Batched matrix multiplication with fused reshape/transpose views and
//! linear int8 quantization.
//!
//! # Quick Start
//!
//! ```
//! use quant_gemm::{matmul, MatmulConfig, Tensor};
//!
//! // 25 independent 2x2 products
//! let x = Tensor::from_f32([25, 2, 2], vec![1.0; 100]).unwrap();
//! let y = Tensor::from_f32([25, 2, 2], vec![0.5; 100]).unwrap();
//!
//! let out = matmul(&x, &y, &MatmulConfig::default()).unwrap();
//! assert_eq!(out.dims(), &[25, 2, 2]);
//! assert!(out.as_f32().unwrap().iter().all(|&v| v == 1.0));
//! ```
//!
//! # Fused Reshape + Transpose
//!
//! Operands can be folded into a matmul-compatible layout without a copy:
//!
//! ```
//! use quant_gemm::{matmul, MatmulConfig, Tensor};
//!
//! // [2, 8, 6] -> reshape [2, 8, 2, 3] -> permute [0, 2, 1, 3] -> [2, 2, 8, 3]
//! let x = Tensor::from_f32([2, 8, 6], vec![1.0; 96]).unwrap();
//! let y = Tensor::from_f32([2, 2, 3, 4], vec![1.0; 48]).unwrap();
//!
//! let config = MatmulConfig::builder()
//!     .fused_x(vec![0, 0, 2, 3], vec![0, 2, 1, 3])
//!     .build()
//!     .unwrap();
//! let out = matmul(&x, &y, &config).unwrap();
//! assert_eq!(out.dims(), &[2, 2, 8, 4]);
//! ```
//!
//! # Quantized Operands
//!
//! ```
//! use quant_gemm::{derive_scale, matmul, quantize, DType, MatmulConfig, Tensor};
//!
//! let xf = Tensor::from_f32([1, 2], vec![0.5, 1.0]).unwrap();
//! let yf = Tensor::from_f32([2, 1], vec![1.0, 0.25]).unwrap();
//! let (sx, sy) = (derive_scale(&xf).unwrap(), derive_scale(&yf).unwrap());
//!
//! let config = MatmulConfig::builder()
//!     .scale_x(sx.value())
//!     .scale_y(sy.value())
//!     .build()
//!     .unwrap();
//! let out = matmul(&quantize(&xf, sx).unwrap(), &quantize(&yf, sy).unwrap(), &config).unwrap();
//!
//! assert_eq!(out.dtype(), DType::F32);
//! assert!((out.as_f32().unwrap()[0] - 0.75).abs() < 0.01);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): compute output rows on the rayon thread pool.

pub mod api;
pub mod core;
pub mod error;
pub mod fc;
pub mod quant;
pub mod types;
pub mod view;

pub use api::{matmul, matmul_backward, matmul_batched, Matmul};
pub use crate::core::{MatmulAttrs, MatmulConfig, MatmulConfigBuilder};
pub use error::{GemmError, Result};
pub use fc::{fc, fc_backward, AffineAttrs, AffineConfig};
pub use quant::{
    dequantize, derive_scale, derive_scale_for, quantize, quantize_unsigned, Dequantizer,
    QuantScale, Signedness,
};
pub use types::{DType, Element, Shape, Storage, Tensor};
pub use view::{reshape, ShapeView};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::api::{matmul, Matmul};
    pub use crate::core::MatmulConfig;
    pub use crate::error::{GemmError, Result};
    pub use crate::fc::{fc, AffineConfig};
    pub use crate::quant::{dequantize, derive_scale, quantize, QuantScale};
    pub use crate::types::{DType, Tensor};
}

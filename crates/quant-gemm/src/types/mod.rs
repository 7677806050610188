//! Tensor and element type definitions.
//!
//! Every kernel in this crate consumes and produces [`Tensor`] values: dense,
//! row-major buffers tagged with a [`DType`].
//!
//! | DType | Rust type | Role |
//! |-------|-----------|------|
//! | [`DType::F32`] | `f32` | Floating operands and dequantized outputs |
//! | [`DType::I8`] | `i8` | Signed quantized operands and outputs, range `[-127, 127]` |
//! | [`DType::U8`] | `u8` | Unsigned quantized operands, range `[0, 255]` |
//!
//! # Core Types
//!
//! - [`Shape`]: dimensions and row-major strides
//! - [`Tensor`]: owned buffer + shape, validated at construction
//! - [`Element`]: sealed trait tying a Rust scalar to its [`DType`]
//!
//! # Example
//!
//! ```rust
//! use quant_gemm::types::{DType, Tensor};
//!
//! let x = Tensor::from_i8([2, 2], vec![1, 2, 3, 4]).unwrap();
//! assert_eq!(x.dtype(), DType::I8);
//! assert!(x.dtype().is_integer());
//! assert_eq!(x.shape().contiguous_strides(), vec![2, 1]);
//! ```

mod dtype;
mod element;
mod shape;
mod tensor;

pub use dtype::DType;
pub use element::Element;
pub use shape::Shape;
pub(crate) use shape::checked_product;
pub use tensor::{Storage, Tensor};

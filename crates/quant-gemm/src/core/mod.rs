//! Batched matrix multiplication over strided operand views.
//!
//! # Algorithm Overview
//!
//! Both operands are resolved into [`ShapeView`](crate::view::ShapeView)s,
//! paired into a [`BatchPlan`], and multiplied without copying:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ for row in 0..batch·M            (one unit of work per row)  │
//! │   b, i = row / M, row % M                                    │
//! │   for j in 0..N                                              │
//! │     acc = 0                                                  │
//! │     for p in 0..K                                            │
//! │       acc += widen(X[b, i, p]) · widen(Y[b, p, j])           │
//! │     C[b, i, j] = acc                                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are distributed across threads with rayon when the `parallel`
//! feature is enabled.
//!
//! # Accumulators
//!
//! | Operands | Accumulator | Conversion |
//! |----------|-------------|------------|
//! | `f32 × f32` | `f32` | multiply by `alpha` |
//! | `{i8,u8} × {i8,u8}` | `i64` | [`Dequantizer`](crate::quant::Dequantizer) when both scales are set |
//!
//! The [`Widen`] trait performs the operand-to-accumulator conversion.
//!
//! # Module Contents
//!
//! - [`batch`](batch): batch pairing and output dimensions
//! - [`config`](config): [`MatmulConfig`] and its builder
//! - [`kernel`](kernel): the strided GEMM loop

mod batch;
mod config;
mod kernel;

pub use batch::BatchPlan;
pub use config::{MatmulAttrs, MatmulConfig, MatmulConfigBuilder};
pub use kernel::{gemm_strided, Accumulator, Widen};

//! Shape-view resolution for fused reshape + transpose.
//!
//! Higher-rank operands are folded into matmul-compatible views without
//! copying: the resolver only computes a shape and per-axis strides into the
//! source buffer.
//!
//! ```text
//! source dims ──reshape──► target dims ──permute──► logical dims
//!     [2, 128, 768]        [2, 128, 12, 64]         [2, 12, 128, 64]
//!                         strides [98304, 768, 64, 1] → [98304, 64, 768, 1]
//!
//! logical dims = batch dims ++ [rows, cols]
//! ```
//!
//! A simple matrix transpose (`transpose_X` / `transpose_Y`) is applied
//! afterwards by [`ShapeView::swap_matrix_axes`].
//!
//! Use [`ShapeView::materialize`] when a contiguous copy is required.

mod reshape;
mod shape_view;

pub use reshape::{reshape, resolve_reshape, validate_permutation};
pub use shape_view::ShapeView;

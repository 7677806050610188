use super::reshape::{resolve_reshape, validate_permutation};
use crate::error::{GemmError, Result};
use crate::types::{Element, Shape, Storage, Tensor};

/// Strided matrix view of a tensor buffer.
///
/// The resolved logical shape is `batch_dims ++ [rows, cols]`. Strides are
/// in elements of the source buffer, so the batch axes need not collapse
/// into a single stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeView {
    batch_dims: Vec<usize>,
    batch_strides: Vec<usize>,
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
    source_numel: usize,
}

impl ShapeView {
    /// Resolve `tensor` through an optional reshape and permutation.
    ///
    /// Empty descriptors are identities. The resolved shape must have at
    /// least two axes; the last two are the matrix axes.
    ///
    /// # Example
    ///
    /// ```
    /// use quant_gemm::{ShapeView, Tensor};
    ///
    /// let x = Tensor::from_f32([2, 5, 10], vec![0.0; 100]).unwrap();
    /// let v = ShapeView::resolve(&x, &[10, 10], &[1, 0]).unwrap();
    /// assert_eq!(v.logical_dims(), vec![10, 10]);
    /// assert_eq!((v.row_stride(), v.col_stride()), (1, 10));
    /// ```
    pub fn resolve(tensor: &Tensor, reshape: &[i64], transpose: &[usize]) -> Result<Self> {
        let dims = resolve_reshape(tensor.dims(), reshape)?;
        let strides = Shape::new(dims.clone()).contiguous_strides();

        let (dims, strides) = if transpose.is_empty() {
            (dims, strides)
        } else {
            validate_permutation(transpose, dims.len())?;
            (
                transpose.iter().map(|&a| dims[a]).collect(),
                transpose.iter().map(|&a| strides[a]).collect(),
            )
        };

        Self::from_parts(dims, strides, tensor.numel())
    }

    fn from_parts(mut dims: Vec<usize>, mut strides: Vec<usize>, source_numel: usize) -> Result<Self> {
        let rank = dims.len();
        if rank < 2 {
            return Err(GemmError::RankError { rank });
        }
        let cols = dims[rank - 1];
        let rows = dims[rank - 2];
        let col_stride = strides[rank - 1];
        let row_stride = strides[rank - 2];
        dims.truncate(rank - 2);
        strides.truncate(rank - 2);

        Ok(Self {
            batch_dims: dims,
            batch_strides: strides,
            rows,
            cols,
            row_stride,
            col_stride,
            source_numel,
        })
    }

    /// Swap the two matrix axes. Applied after any descriptor permutation.
    pub fn swap_matrix_axes(mut self) -> Self {
        std::mem::swap(&mut self.rows, &mut self.cols);
        std::mem::swap(&mut self.row_stride, &mut self.col_stride);
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn col_stride(&self) -> usize {
        self.col_stride
    }

    /// Leading axes in front of the matrix axes.
    pub fn batch_dims(&self) -> &[usize] {
        &self.batch_dims
    }

    /// Product of the batch axes (1 when there are none).
    pub fn batch_size(&self) -> usize {
        self.batch_dims.iter().product()
    }

    pub fn is_batched(&self) -> bool {
        !self.batch_dims.is_empty()
    }

    /// `batch_dims ++ [rows, cols]`.
    pub fn logical_dims(&self) -> Vec<usize> {
        let mut dims = self.batch_dims.clone();
        dims.push(self.rows);
        dims.push(self.cols);
        dims
    }

    /// Buffer offset of the first element of flattened batch `b`.
    #[inline]
    pub fn batch_offset(&self, b: usize) -> usize {
        let mut rem = b;
        let mut offset = 0;
        for (&dim, &stride) in self.batch_dims.iter().zip(&self.batch_strides).rev() {
            offset += (rem % dim) * stride;
            rem /= dim;
        }
        offset
    }

    /// Buffer offset of element `(b, r, c)`.
    #[inline]
    pub fn offset(&self, b: usize, r: usize, c: usize) -> usize {
        self.batch_offset(b) + r * self.row_stride + c * self.col_stride
    }

    /// Copy the viewed elements into a new contiguous tensor of shape
    /// [`logical_dims`](Self::logical_dims).
    pub fn materialize(&self, tensor: &Tensor) -> Result<Tensor> {
        if tensor.numel() != self.source_numel {
            return Err(GemmError::ShapeMismatch(format!(
                "view was resolved for {} elements, tensor holds {}",
                self.source_numel,
                tensor.numel()
            )));
        }
        let storage = match tensor.storage() {
            Storage::F32(v) => f32::into_storage(self.gather(v)),
            Storage::I8(v) => i8::into_storage(self.gather(v)),
            Storage::U8(v) => u8::into_storage(self.gather(v)),
        };
        Tensor::from_storage(Shape::new(self.logical_dims()), storage)
    }

    fn gather<T: Copy>(&self, data: &[T]) -> Vec<T> {
        let mut out = Vec::with_capacity(self.batch_size() * self.rows * self.cols);
        for b in 0..self.batch_size() {
            for r in 0..self.rows {
                for c in 0..self.cols {
                    out.push(data[self.offset(b, r, c)]);
                }
            }
        }
        out
    }
}

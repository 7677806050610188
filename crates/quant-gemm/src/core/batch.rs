use crate::error::{GemmError, Result};
use crate::view::ShapeView;

/// Problem dimensions of a batched product `C[b] = X[b] · Y[b]`.
///
/// An operand without batch axes is shared by every batch of the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    batch_dims: Vec<usize>,
    /// Rows of X and C.
    pub m: usize,
    /// Columns of Y and C.
    pub n: usize,
    /// Reduction length.
    pub k: usize,
}

impl BatchPlan {
    /// Pair two resolved operand views.
    pub fn new(x: &ShapeView, y: &ShapeView) -> Result<Self> {
        if x.cols() != y.rows() {
            return Err(GemmError::DimensionMismatch(format!(
                "X is {}x{} but Y is {}x{}",
                x.rows(),
                x.cols(),
                y.rows(),
                y.cols()
            )));
        }

        let batch_dims = match (x.is_batched(), y.is_batched()) {
            (true, true) if x.batch_dims() == y.batch_dims() => x.batch_dims().to_vec(),
            (true, true) => {
                return Err(GemmError::BatchMismatch {
                    x: x.batch_dims().to_vec(),
                    y: y.batch_dims().to_vec(),
                })
            }
            (true, false) => x.batch_dims().to_vec(),
            (false, true) => y.batch_dims().to_vec(),
            (false, false) => Vec::new(),
        };

        Ok(Self {
            batch_dims,
            m: x.rows(),
            n: y.cols(),
            k: x.cols(),
        })
    }

    pub fn batch_dims(&self) -> &[usize] {
        &self.batch_dims
    }

    pub fn batch_size(&self) -> usize {
        self.batch_dims.iter().product()
    }

    /// `batch_dims ++ [m, n]`.
    pub fn output_dims(&self) -> Vec<usize> {
        let mut dims = self.batch_dims.clone();
        dims.push(self.m);
        dims.push(self.n);
        dims
    }

    pub fn output_len(&self) -> usize {
        self.batch_size() * self.m * self.n
    }
}

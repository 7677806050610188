//! Error types for kernel operations.

use thiserror::Error;

use crate::types::DType;

/// Errors that can occur while resolving views, quantizing or multiplying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GemmError {
    /// Element counts disagree (reshape target, residual, bias, buffer).
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A resolved view has fewer than two axes.
    #[error("Rank error: expected at least 2 axes, got {rank}")]
    RankError { rank: usize },

    /// Inner dimensions of a product disagree.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Leading batch dimensions cannot be paired.
    #[error("Batch mismatch: X batch {x:?} vs Y batch {y:?}")]
    BatchMismatch { x: Vec<usize>, y: Vec<usize> },

    /// Scale derivation from a tensor whose elements are all zero.
    #[error("Cannot derive a quantization scale from an all-zero tensor")]
    DegenerateTensor,

    /// The operation is not provided by an inference-only kernel.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Empty shape or zero-sized dimension.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Malformed reshape or permutation descriptor.
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Operand element type not accepted by the operation.
    #[error("Dtype mismatch: expected {expected}, got {actual}")]
    DtypeMismatch { expected: String, actual: DType },

    /// Configuration value rejected at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, GemmError>;

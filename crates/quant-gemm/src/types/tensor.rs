//! Owned dense tensors.

use std::fmt;

use super::{DType, Element, Shape};
use crate::error::{GemmError, Result};

/// Backing buffer of a [`Tensor`], tagged by element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    F32(Vec<f32>),
    I8(Vec<i8>),
    U8(Vec<u8>),
}

impl Storage {
    pub fn dtype(&self) -> DType {
        match self {
            Storage::F32(_) => DType::F32,
            Storage::I8(_) => DType::I8,
            Storage::U8(_) => DType::U8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::F32(v) => v.len(),
            Storage::I8(v) => v.len(),
            Storage::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense row-major N-dimensional array of `f32`, `i8` or `u8`.
///
/// Every constructor checks that the shape has at least one axis, that no
/// axis is zero, and that the buffer holds exactly `shape.numel()` elements.
///
/// # Example
///
/// ```
/// use quant_gemm::{DType, Tensor};
///
/// let t = Tensor::from_f32([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// assert_eq!(t.dims(), &[2, 3]);
/// assert_eq!(t.dtype(), DType::F32);
/// assert_eq!(t.numel(), 6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    storage: Storage,
}

impl Tensor {
    /// Create a tensor from a typed buffer.
    pub fn new<T: Element>(shape: impl Into<Shape>, data: Vec<T>) -> Result<Self> {
        Self::from_storage(shape.into(), T::into_storage(data))
    }

    pub fn from_f32(shape: impl Into<Shape>, data: Vec<f32>) -> Result<Self> {
        Self::new(shape, data)
    }

    pub fn from_i8(shape: impl Into<Shape>, data: Vec<i8>) -> Result<Self> {
        Self::new(shape, data)
    }

    pub fn from_u8(shape: impl Into<Shape>, data: Vec<u8>) -> Result<Self> {
        Self::new(shape, data)
    }

    pub(crate) fn from_storage(shape: Shape, storage: Storage) -> Result<Self> {
        validate_shape(&shape)?;
        if storage.len() != shape.numel() {
            return Err(GemmError::ShapeMismatch(format!(
                "buffer holds {} elements, shape {} needs {}",
                storage.len(),
                shape,
                shape.numel()
            )));
        }
        Ok(Self { shape, storage })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Buffer size in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.numel() * self.dtype().size_in_bytes()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Borrow the buffer as `T`, failing if the tensor holds another type.
    pub fn data<T: Element>(&self) -> Result<&[T]> {
        T::slice(&self.storage).ok_or_else(|| GemmError::DtypeMismatch {
            expected: T::DTYPE.to_string(),
            actual: self.dtype(),
        })
    }

    pub fn as_f32(&self) -> Result<&[f32]> {
        self.data::<f32>()
    }

    pub fn as_i8(&self) -> Result<&[i8]> {
        self.data::<i8>()
    }

    pub fn as_u8(&self) -> Result<&[u8]> {
        self.data::<u8>()
    }

    /// Copy of the buffer widened to `f32`.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.storage {
            Storage::F32(v) => v.clone(),
            Storage::I8(v) => v.iter().map(|&x| x.to_f32()).collect(),
            Storage::U8(v) => v.iter().map(|&x| x.to_f32()).collect(),
        }
    }

    /// Same buffer under a new shape with the same element count.
    pub(crate) fn with_shape(self, shape: Shape) -> Result<Self> {
        Self::from_storage(shape, self.storage)
    }

    pub fn into_storage(self) -> Storage {
        self.storage
    }

    /// Take the buffer as `T`, failing if the tensor holds another type.
    pub fn into_data<T: Element>(self) -> Result<Vec<T>> {
        let actual = self.dtype();
        T::take(self.storage).ok_or_else(|| GemmError::DtypeMismatch {
            expected: T::DTYPE.to_string(),
            actual,
        })
    }
}

fn validate_shape(shape: &Shape) -> Result<()> {
    if shape.ndim() == 0 {
        return Err(GemmError::InvalidShape("shape cannot be empty".to_string()));
    }
    if shape.dims().contains(&0) {
        return Err(GemmError::InvalidShape(format!(
            "shape {} contains a zero dimension",
            shape
        )));
    }
    if shape.checked_numel().is_none() {
        return Err(GemmError::InvalidShape(format!(
            "shape {} has more elements than fit in usize",
            shape
        )));
    }
    Ok(())
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(shape={}, dtype={})", self.shape, self.dtype())
    }
}

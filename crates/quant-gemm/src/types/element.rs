use std::fmt::Debug;

use super::{DType, Storage};

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for i8 {}
    impl Sealed for u8 {}
}

/// Scalar types a [`Tensor`](super::Tensor) can hold.
///
/// Implemented for `f32`, `i8` and `u8` only.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + 'static + sealed::Sealed {
    /// Tag stored alongside the buffer.
    const DTYPE: DType;

    /// Borrow the buffer if it holds this element type.
    fn slice(storage: &Storage) -> Option<&[Self]>;

    /// Wrap an owned buffer.
    fn into_storage(data: Vec<Self>) -> Storage;

    /// Unwrap an owned buffer if it holds this element type.
    fn take(storage: Storage) -> Option<Vec<Self>>;

    /// Widen to `f32` without rescaling.
    fn to_f32(self) -> f32;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::F32(v) => Some(v),
            _ => None,
        }
    }

    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::F32(data)
    }

    fn take(storage: Storage) -> Option<Vec<Self>> {
        match storage {
            Storage::F32(v) => Some(v),
            _ => None,
        }
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }
}

impl Element for i8 {
    const DTYPE: DType = DType::I8;

    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::I8(v) => Some(v),
            _ => None,
        }
    }

    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::I8(data)
    }

    fn take(storage: Storage) -> Option<Vec<Self>> {
        match storage {
            Storage::I8(v) => Some(v),
            _ => None,
        }
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Element for u8 {
    const DTYPE: DType = DType::U8;

    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::U8(v) => Some(v),
            _ => None,
        }
    }

    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::U8(data)
    }

    fn take(storage: Storage) -> Option<Vec<Self>> {
        match storage {
            Storage::U8(v) => Some(v),
            _ => None,
        }
    }

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

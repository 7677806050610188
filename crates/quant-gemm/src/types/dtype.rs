use std::fmt;

/// Element type of a [`Tensor`](super::Tensor) buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE float.
    F32,
    /// Signed 8-bit integer, quantized range `[-127, 127]`.
    I8,
    /// Unsigned 8-bit integer, quantized range `[0, 255]`.
    U8,
}

impl DType {
    /// Bytes per element.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::I8 | DType::U8 => 1,
        }
    }

    /// True for the 8-bit quantized types.
    pub const fn is_integer(self) -> bool {
        matches!(self, DType::I8 | DType::U8)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::I8 => "i8",
            DType::U8 => "u8",
        };
        f.write_str(name)
    }
}

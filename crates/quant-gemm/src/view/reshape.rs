//! Reshape descriptors and the standalone reshape operation.

use crate::error::{GemmError, Result};
use crate::types::{checked_product, Shape, Tensor};

/// Resolve a reshape descriptor against a source shape.
///
/// An empty descriptor is the identity. Entries are target dimensions,
/// except `0` (copy the source dimension at the same index) and `-1`
/// (inferred from the remaining element count, at most once).
///
/// # Example
///
/// ```
/// use quant_gemm::view::resolve_reshape;
///
/// let dims = resolve_reshape(&[2, 128, 768], &[0, 0, 12, 64]).unwrap();
/// assert_eq!(dims, vec![2, 128, 12, 64]);
///
/// let dims = resolve_reshape(&[5, 10], &[5, -1, 5]).unwrap();
/// assert_eq!(dims, vec![5, 2, 5]);
/// ```
pub fn resolve_reshape(src: &[usize], descriptor: &[i64]) -> Result<Vec<usize>> {
    if descriptor.is_empty() {
        return Ok(src.to_vec());
    }

    let total = checked_product(src).ok_or_else(|| {
        GemmError::ShapeMismatch(format!("source shape {:?} overflows usize", src))
    })?;
    let mut dims = Vec::with_capacity(descriptor.len());
    let mut infer_at = None;

    for (i, &d) in descriptor.iter().enumerate() {
        match d {
            -1 => {
                if infer_at.is_some() {
                    return Err(GemmError::InvalidDescriptor(format!(
                        "reshape {:?} has more than one -1 entry",
                        descriptor
                    )));
                }
                infer_at = Some(i);
                dims.push(1);
            }
            0 => {
                let copied = src.get(i).copied().ok_or_else(|| {
                    GemmError::InvalidDescriptor(format!(
                        "reshape {:?} copies axis {} but the source has rank {}",
                        descriptor,
                        i,
                        src.len()
                    ))
                })?;
                dims.push(copied);
            }
            d if d > 0 => dims.push(usize::try_from(d).map_err(|_| {
                GemmError::ShapeMismatch(format!(
                    "reshape {:?} entry {} does not fit in usize",
                    descriptor, d
                ))
            })?),
            d => {
                return Err(GemmError::InvalidDescriptor(format!(
                    "reshape {:?} has invalid entry {}",
                    descriptor, d
                )))
            }
        }
    }

    let known = checked_product(&dims).ok_or_else(|| {
        GemmError::ShapeMismatch(format!(
            "reshape {:?} holds more elements than fit in usize, source {:?} holds {}",
            descriptor, src, total
        ))
    })?;
    if let Some(i) = infer_at {
        if known == 0 || total % known != 0 {
            return Err(GemmError::ShapeMismatch(format!(
                "cannot infer -1 in reshape {:?} of {} elements",
                descriptor, total
            )));
        }
        dims[i] = total / known;
    } else if known != total {
        return Err(GemmError::ShapeMismatch(format!(
            "reshape {:?} holds {} elements, source {:?} holds {}",
            descriptor, known, src, total
        )));
    }

    Ok(dims)
}

/// Check that `perm` is a permutation of `0..rank`.
pub fn validate_permutation(perm: &[usize], rank: usize) -> Result<()> {
    if perm.len() != rank {
        return Err(GemmError::InvalidDescriptor(format!(
            "permutation {:?} has {} axes, shape has {}",
            perm,
            perm.len(),
            rank
        )));
    }
    let mut seen = vec![false; rank];
    for &axis in perm {
        if axis >= rank || seen[axis] {
            return Err(GemmError::InvalidDescriptor(format!(
                "{:?} is not a permutation of 0..{}",
                perm, rank
            )));
        }
        seen[axis] = true;
    }
    Ok(())
}

/// Reshape a tensor of any dtype. The buffer is copied unchanged.
pub fn reshape(tensor: &Tensor, descriptor: &[i64]) -> Result<Tensor> {
    let dims = resolve_reshape(tensor.dims(), descriptor)?;
    tensor.clone().with_shape(Shape::new(dims))
}

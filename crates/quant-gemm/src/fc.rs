//! Fully-connected (affine) layer: `Out = X · W + bias [+ residual]`.

use serde::Deserialize;

use crate::api::matmul;
use crate::core::MatmulConfig;
use crate::error::{GemmError, Result};
use crate::types::{Shape, Tensor};

/// Serialized attributes of the fully-connected operator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AffineAttrs {
    pub fuse_residual: bool,
    pub in_num_col_dims: usize,
}

impl Default for AffineAttrs {
    fn default() -> Self {
        Self {
            fuse_residual: false,
            in_num_col_dims: 1,
        }
    }
}

/// Configuration of one [`fc`] call.
///
/// `in_num_col_dims` splits the input shape: the leading axes become rows,
/// the remaining axes are flattened into input features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineConfig<'a> {
    residual: Option<&'a Tensor>,
    fuse_residual: bool,
    in_num_col_dims: usize,
}

impl Default for AffineConfig<'_> {
    fn default() -> Self {
        Self {
            residual: None,
            fuse_residual: false,
            in_num_col_dims: 1,
        }
    }
}

impl<'a> AffineConfig<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `residual` elementwise to the output.
    pub fn with_residual(mut self, residual: &'a Tensor) -> Self {
        self.residual = Some(residual);
        self.fuse_residual = true;
        self
    }

    pub fn in_num_col_dims(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(GemmError::InvalidConfig(
                "in_num_col_dims must be at least 1".to_string(),
            ));
        }
        self.in_num_col_dims = n;
        Ok(self)
    }

    /// Build from serialized attributes plus the optional residual input.
    pub fn from_attrs(attrs: &AffineAttrs, residual: Option<&'a Tensor>) -> Result<Self> {
        if attrs.fuse_residual && residual.is_none() {
            return Err(GemmError::InvalidConfig(
                "fuse_residual is set but no residual tensor was given".to_string(),
            ));
        }
        let config = Self {
            residual,
            fuse_residual: attrs.fuse_residual,
            in_num_col_dims: 1,
        };
        config.in_num_col_dims(attrs.in_num_col_dims)
    }

    pub fn residual(&self) -> Option<&'a Tensor> {
        self.residual
    }

    pub fn fuse_residual(&self) -> bool {
        self.fuse_residual
    }
}

/// Fully-connected layer over `f32` tensors.
///
/// X is flattened to `[rows, in_features]` at `in_num_col_dims`, multiplied
/// by `W: [in_features, out_features]`, and `bias: [out_features]` is added
/// to every row. With residual fusion the residual (same shape as the
/// output) is added last. The output shape is
/// `X.shape[..in_num_col_dims] ++ [out_features]`.
///
/// # Example
///
/// ```
/// use quant_gemm::{fc, AffineConfig, Tensor};
///
/// let x = Tensor::from_f32([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let w = Tensor::from_f32([2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
/// let bias = Tensor::from_f32([2], vec![0.0, 0.0]).unwrap();
///
/// let out = fc(&x, &w, &bias, &AffineConfig::default()).unwrap();
/// assert_eq!(out.as_f32().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn fc(x: &Tensor, w: &Tensor, bias: &Tensor, config: &AffineConfig<'_>) -> Result<Tensor> {
    x.as_f32()?;
    w.as_f32()?;
    let bias_data = bias.as_f32()?;

    let split = config.in_num_col_dims;
    if split >= x.ndim() {
        return Err(GemmError::InvalidConfig(format!(
            "in_num_col_dims {} needs an input of rank > {}, got {}",
            split,
            split,
            x.shape()
        )));
    }
    if w.ndim() != 2 {
        return Err(GemmError::ShapeMismatch(format!(
            "weights must be [in_features, out_features], got {}",
            w.shape()
        )));
    }

    let rows: usize = x.dims()[..split].iter().product();
    let in_features: usize = x.dims()[split..].iter().product();
    let (w_in, out_features) = (w.dims()[0], w.dims()[1]);
    if in_features != w_in {
        return Err(GemmError::DimensionMismatch(format!(
            "input {} has {} features, weights {} expect {}",
            x.shape(),
            in_features,
            w.shape(),
            w_in
        )));
    }
    if bias.ndim() != 1 || bias.numel() != out_features {
        return Err(GemmError::ShapeMismatch(format!(
            "bias {} does not match {} output features",
            bias.shape(),
            out_features
        )));
    }

    let mut out_dims = x.dims()[..split].to_vec();
    out_dims.push(out_features);
    let out_shape = Shape::new(out_dims);

    let residual = match (config.fuse_residual, config.residual) {
        (false, _) => None,
        (true, None) => {
            return Err(GemmError::InvalidConfig(
                "fuse_residual is set but no residual tensor was given".to_string(),
            ))
        }
        (true, Some(r)) if r.shape() != &out_shape => {
            return Err(GemmError::ShapeMismatch(format!(
                "residual {} does not match output {}",
                r.shape(),
                out_shape
            )))
        }
        (true, Some(r)) => Some(r.as_f32()?),
    };

    log::debug!(
        "fc: rows={}, in={}, out={}, residual={}",
        rows,
        in_features,
        out_features,
        residual.is_some()
    );

    let product_config = MatmulConfig::builder()
        .fused_x(vec![rows as i64, in_features as i64], Vec::new())
        .build()?;
    let mut out = matmul(x, w, &product_config)?.into_data::<f32>()?;

    for row in out.chunks_mut(out_features) {
        row.iter_mut().zip(bias_data).for_each(|(o, &b)| *o += b);
    }
    if let Some(r) = residual {
        out.iter_mut().zip(r).for_each(|(o, &v)| *o += v);
    }

    Tensor::new(out_shape, out)
}

/// Gradients of [`fc`]. The layer is inference-only.
///
/// # Errors
///
/// Always returns [`GemmError::UnsupportedOperation`].
pub fn fc_backward(
    _x: &Tensor,
    _w: &Tensor,
    _grad_out: &Tensor,
    _config: &AffineConfig<'_>,
) -> Result<(Tensor, Tensor, Tensor)> {
    Err(GemmError::UnsupportedOperation(
        "fc is inference-only and has no gradient kernel".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(dims: &[usize], data: Vec<f32>) -> Tensor {
        Tensor::from_f32(dims, data).unwrap()
    }

    #[test]
    fn test_fc_identity_weights() {
        let x = t(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let w = t(&[2, 2], vec![1.0, 0.0, 0.0, 1.0]);
        let bias = t(&[2], vec![0.0, 0.0]);

        let out = fc(&x, &w, &bias, &AffineConfig::default()).unwrap();

        assert_eq!(out.dims(), &[2, 2]);
        assert_eq!(out.as_f32().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fc_bias_broadcast() {
        let x = t(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let w = t(&[3, 1], vec![1.0, 1.0, 1.0]);
        let bias = t(&[1], vec![0.5]);

        let out = fc(&x, &w, &bias, &AffineConfig::default()).unwrap();

        assert_eq!(out.as_f32().unwrap(), &[6.5, 15.5]);
    }

    #[test]
    fn test_fc_residual() {
        let x = t(&[1, 2], vec![1.0, 2.0]);
        let w = t(&[2, 2], vec![1.0, 0.0, 0.0, 1.0]);
        let bias = t(&[2], vec![1.0, 1.0]);
        let residual = t(&[1, 2], vec![10.0, 20.0]);

        let config = AffineConfig::new().with_residual(&residual);
        let out = fc(&x, &w, &bias, &config).unwrap();

        assert_eq!(out.as_f32().unwrap(), &[12.0, 23.0]);
    }

    #[test]
    fn test_fc_residual_shape_mismatch() {
        let x = t(&[1, 2], vec![1.0, 2.0]);
        let w = t(&[2, 2], vec![1.0, 0.0, 0.0, 1.0]);
        let bias = t(&[2], vec![0.0, 0.0]);
        let residual = t(&[2, 1], vec![1.0, 1.0]);

        let config = AffineConfig::new().with_residual(&residual);
        assert!(matches!(
            fc(&x, &w, &bias, &config),
            Err(GemmError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_fc_flattens_input() {
        // [2, 2, 2] -> rows=2, in=4
        let x = t(&[2, 2, 2], vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
        let w = t(&[4, 1], vec![1.0, 1.0, 1.0, 1.0]);
        let bias = t(&[1], vec![0.0]);

        let out = fc(&x, &w, &bias, &AffineConfig::default()).unwrap();

        assert_eq!(out.dims(), &[2, 1]);
        assert_eq!(out.as_f32().unwrap(), &[4.0, 8.0]);
    }

    #[test]
    fn test_fc_in_num_col_dims() {
        let x = t(&[2, 2, 2], (0..8).map(|i| i as f32).collect());
        let w = t(&[2, 1], vec![1.0, 1.0]);
        let bias = t(&[1], vec![0.0]);
        let config = AffineConfig::new().in_num_col_dims(2).unwrap();

        let out = fc(&x, &w, &bias, &config).unwrap();

        assert_eq!(out.dims(), &[2, 2, 1]);
        assert_eq!(out.as_f32().unwrap(), &[1.0, 5.0, 9.0, 13.0]);
    }

    #[test]
    fn test_fc_errors() {
        let x = t(&[2, 3], vec![0.0; 6]);
        let w = t(&[2, 2], vec![0.0; 4]);
        let bias = t(&[2], vec![0.0; 2]);
        assert!(matches!(
            fc(&x, &w, &bias, &AffineConfig::default()),
            Err(GemmError::DimensionMismatch(_))
        ));

        let w = t(&[3, 2], vec![0.0; 6]);
        let bad_bias = t(&[3], vec![0.0; 3]);
        assert!(matches!(
            fc(&x, &w, &bad_bias, &AffineConfig::default()),
            Err(GemmError::ShapeMismatch(_))
        ));

        let xi = Tensor::from_i8([2, 3], vec![0; 6]).unwrap();
        assert!(matches!(
            fc(&xi, &w, &bias, &AffineConfig::default()),
            Err(GemmError::DtypeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_attrs() {
        let attrs = AffineAttrs {
            fuse_residual: true,
            in_num_col_dims: 1,
        };
        assert!(matches!(
            AffineConfig::from_attrs(&attrs, None),
            Err(GemmError::InvalidConfig(_))
        ));

        let r = t(&[1], vec![0.0]);
        let config = AffineConfig::from_attrs(&attrs, Some(&r)).unwrap();
        assert!(config.fuse_residual());
        assert!(config.residual().is_some());
    }

    #[test]
    fn test_fc_backward_unsupported() {
        let x = t(&[1, 1], vec![1.0]);
        assert!(matches!(
            fc_backward(&x, &x, &x, &AffineConfig::default()),
            Err(GemmError::UnsupportedOperation(_))
        ));
    }
}

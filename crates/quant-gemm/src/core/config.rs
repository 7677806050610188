use serde::Deserialize;

use crate::error::{GemmError, Result};
use crate::quant::{Dequantizer, QuantScale};
use crate::view::validate_permutation;

/// Immutable configuration of one [`matmul`](crate::matmul) call.
///
/// Built with [`MatmulConfig::builder`] or deserialized from the operator
/// attribute names (`transpose_X`, `fused_reshape_Y`, `Scale_out`, ...).
/// Both paths run the same validation, so a constructed config is always
/// well-formed.
///
/// # Example
///
/// ```
/// use quant_gemm::MatmulConfig;
///
/// let config = MatmulConfig::builder()
///     .transpose_y()
///     .fused_x(vec![0, 0, 12, 64], vec![0, 2, 1, 3])
///     .alpha(0.125)
///     .build()
///     .unwrap();
/// assert!(config.transpose_y());
/// assert_eq!(config.alpha(), 0.125);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MatmulAttrs")]
pub struct MatmulConfig {
    transpose_x: bool,
    transpose_y: bool,
    fused_reshape_x: Vec<i64>,
    fused_reshape_y: Vec<i64>,
    fused_transpose_x: Vec<usize>,
    fused_transpose_y: Vec<usize>,
    alpha: f32,
    scale_x: Option<QuantScale>,
    scale_y: Option<QuantScale>,
    scale_out: Option<QuantScale>,
    force_fp32_output: bool,
}

impl Default for MatmulConfig {
    fn default() -> Self {
        Self {
            transpose_x: false,
            transpose_y: false,
            fused_reshape_x: Vec::new(),
            fused_reshape_y: Vec::new(),
            fused_transpose_x: Vec::new(),
            fused_transpose_y: Vec::new(),
            alpha: 1.0,
            scale_x: None,
            scale_y: None,
            scale_out: None,
            force_fp32_output: false,
        }
    }
}

impl MatmulConfig {
    pub fn builder() -> MatmulConfigBuilder {
        MatmulConfigBuilder::default()
    }

    pub fn transpose_x(&self) -> bool {
        self.transpose_x
    }

    pub fn transpose_y(&self) -> bool {
        self.transpose_y
    }

    pub fn fused_reshape_x(&self) -> &[i64] {
        &self.fused_reshape_x
    }

    pub fn fused_reshape_y(&self) -> &[i64] {
        &self.fused_reshape_y
    }

    pub fn fused_transpose_x(&self) -> &[usize] {
        &self.fused_transpose_x
    }

    pub fn fused_transpose_y(&self) -> &[usize] {
        &self.fused_transpose_y
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn scale_x(&self) -> Option<QuantScale> {
        self.scale_x
    }

    pub fn scale_y(&self) -> Option<QuantScale> {
        self.scale_y
    }

    pub fn scale_out(&self) -> Option<QuantScale> {
        self.scale_out
    }

    pub fn force_fp32_output(&self) -> bool {
        self.force_fp32_output
    }

    /// Accumulator conversion for integer operands, present only when both
    /// operand scales are set.
    pub fn dequantizer(&self) -> Option<Dequantizer> {
        let (sx, sy) = (self.scale_x?, self.scale_y?);
        Some(
            Dequantizer::new(sx, sy)
                .scale_out(self.scale_out)
                .force_fp32_output(self.force_fp32_output)
                .alpha(self.alpha),
        )
    }
}

/// Raw operator attributes as they appear in serialized configs.
///
/// Every field is optional; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatmulAttrs {
    #[serde(rename = "transpose_X")]
    pub transpose_x: bool,
    #[serde(rename = "transpose_Y")]
    pub transpose_y: bool,
    #[serde(rename = "fused_reshape_X")]
    pub fused_reshape_x: Vec<i64>,
    #[serde(rename = "fused_reshape_Y")]
    pub fused_reshape_y: Vec<i64>,
    #[serde(rename = "fused_transpose_X")]
    pub fused_transpose_x: Vec<usize>,
    #[serde(rename = "fused_transpose_Y")]
    pub fused_transpose_y: Vec<usize>,
    pub alpha: f32,
    #[serde(rename = "Scale_x")]
    pub scale_x: Option<f32>,
    #[serde(rename = "Scale_y")]
    pub scale_y: Option<f32>,
    #[serde(rename = "Scale_out")]
    pub scale_out: Option<f32>,
    pub force_fp32_output: bool,
}

impl Default for MatmulAttrs {
    fn default() -> Self {
        Self {
            transpose_x: false,
            transpose_y: false,
            fused_reshape_x: Vec::new(),
            fused_reshape_y: Vec::new(),
            fused_transpose_x: Vec::new(),
            fused_transpose_y: Vec::new(),
            alpha: 1.0,
            scale_x: None,
            scale_y: None,
            scale_out: None,
            force_fp32_output: false,
        }
    }
}

impl TryFrom<MatmulAttrs> for MatmulConfig {
    type Error = GemmError;

    fn try_from(attrs: MatmulAttrs) -> Result<Self> {
        if !attrs.alpha.is_finite() {
            return Err(GemmError::InvalidConfig(format!(
                "alpha must be finite, got {}",
                attrs.alpha
            )));
        }
        check_fused(&attrs.fused_reshape_x, &attrs.fused_transpose_x, "X")?;
        check_fused(&attrs.fused_reshape_y, &attrs.fused_transpose_y, "Y")?;

        Ok(Self {
            transpose_x: attrs.transpose_x,
            transpose_y: attrs.transpose_y,
            fused_reshape_x: attrs.fused_reshape_x,
            fused_reshape_y: attrs.fused_reshape_y,
            fused_transpose_x: attrs.fused_transpose_x,
            fused_transpose_y: attrs.fused_transpose_y,
            alpha: attrs.alpha,
            scale_x: attrs.scale_x.map(QuantScale::new).transpose()?,
            scale_y: attrs.scale_y.map(QuantScale::new).transpose()?,
            scale_out: attrs.scale_out.map(QuantScale::new).transpose()?,
            force_fp32_output: attrs.force_fp32_output,
        })
    }
}

/// Checks that do not need the operand shape. Element counts are checked
/// when the view is resolved.
fn check_fused(reshape: &[i64], transpose: &[usize], operand: &str) -> Result<()> {
    if reshape.iter().any(|&d| d < -1) || reshape.iter().filter(|&&d| d == -1).count() > 1 {
        return Err(GemmError::InvalidDescriptor(format!(
            "fused_reshape_{} {:?}: entries must be positive, 0 or a single -1",
            operand, reshape
        )));
    }
    if !transpose.is_empty() {
        validate_permutation(transpose, transpose.len())?;
        if !reshape.is_empty() && reshape.len() != transpose.len() {
            return Err(GemmError::InvalidDescriptor(format!(
                "fused_reshape_{} has {} axes but fused_transpose_{} has {}",
                operand,
                reshape.len(),
                operand,
                transpose.len()
            )));
        }
    }
    Ok(())
}

/// Fluent builder for [`MatmulConfig`].
#[derive(Debug, Clone, Default)]
pub struct MatmulConfigBuilder {
    attrs: MatmulAttrs,
}

impl MatmulConfigBuilder {
    /// Swap the matrix axes of X.
    pub fn transpose_x(mut self) -> Self {
        self.attrs.transpose_x = true;
        self
    }

    /// Swap the matrix axes of Y.
    pub fn transpose_y(mut self) -> Self {
        self.attrs.transpose_y = true;
        self
    }

    /// Fold X through a reshape and permutation before the multiply.
    pub fn fused_x(mut self, reshape: Vec<i64>, transpose: Vec<usize>) -> Self {
        self.attrs.fused_reshape_x = reshape;
        self.attrs.fused_transpose_x = transpose;
        self
    }

    /// Fold Y through a reshape and permutation before the multiply.
    pub fn fused_y(mut self, reshape: Vec<i64>, transpose: Vec<usize>) -> Self {
        self.attrs.fused_reshape_y = reshape;
        self.attrs.fused_transpose_y = transpose;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.attrs.alpha = alpha;
        self
    }

    pub fn scale_x(mut self, scale: f32) -> Self {
        self.attrs.scale_x = Some(scale);
        self
    }

    pub fn scale_y(mut self, scale: f32) -> Self {
        self.attrs.scale_y = Some(scale);
        self
    }

    pub fn scale_out(mut self, scale: f32) -> Self {
        self.attrs.scale_out = Some(scale);
        self
    }

    /// Produce `f32` output even when `scale_out` is set.
    pub fn force_fp32_output(mut self) -> Self {
        self.attrs.force_fp32_output = true;
        self
    }

    pub fn build(self) -> Result<MatmulConfig> {
        MatmulConfig::try_from(self.attrs)
    }
}

impl From<MatmulAttrs> for MatmulConfigBuilder {
    fn from(attrs: MatmulAttrs) -> Self {
        Self { attrs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DType;

    #[test]
    fn test_default_config() {
        let config = MatmulConfig::default();
        assert_eq!(config, MatmulConfig::builder().build().unwrap());
        assert_eq!(config.alpha(), 1.0);
        assert!(config.dequantizer().is_none());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = MatmulConfig::builder()
            .transpose_x()
            .fused_y(vec![10, 10], vec![1, 0])
            .scale_x(2.0)
            .scale_y(3.0)
            .scale_out(4.0)
            .build()
            .unwrap();
        assert!(config.transpose_x());
        assert!(!config.transpose_y());
        assert_eq!(config.fused_reshape_y(), &[10, 10]);
        assert_eq!(config.fused_transpose_y(), &[1, 0]);
        assert_eq!(config.scale_out().map(QuantScale::value), Some(4.0));
        assert_eq!(config.dequantizer().unwrap().output_dtype(), DType::I8);
    }

    #[test]
    fn test_one_sided_scale_has_no_dequantizer() {
        let config = MatmulConfig::builder().scale_x(2.0).build().unwrap();
        assert!(config.dequantizer().is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            MatmulConfig::builder().alpha(f32::NAN).build(),
            Err(GemmError::InvalidConfig(_))
        ));
        assert!(matches!(
            MatmulConfig::builder().scale_y(0.0).build(),
            Err(GemmError::InvalidConfig(_))
        ));
        assert!(matches!(
            MatmulConfig::builder().fused_x(vec![], vec![0, 0]).build(),
            Err(GemmError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            MatmulConfig::builder()
                .fused_x(vec![-1, -1], vec![])
                .build(),
            Err(GemmError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            MatmulConfig::builder()
                .fused_x(vec![2, 3, 4], vec![1, 0])
                .build(),
            Err(GemmError::InvalidDescriptor(_))
        ));
    }
}

//! Fully-connected layer against `X · W + bias [+ residual]` computed naively.

mod common;

use common::*;
use quant_gemm::{fc, AffineAttrs, AffineConfig, GemmError, Tensor};

/// Input `[batch, channels * height * width]`, weights `[in, out]`.
fn layer(batch: usize, in_features: usize, out_features: usize, seed: u64) -> (Tensor, Tensor, Tensor) {
    let x = Tensor::from_f32([batch, in_features], uniform(batch * in_features, seed)).unwrap();
    let w = Tensor::from_f32(
        [in_features, out_features],
        uniform(in_features * out_features, seed + 1),
    )
    .unwrap();
    let bias = Tensor::from_f32([out_features], uniform(out_features, seed + 2)).unwrap();
    (x, w, bias)
}

fn expected(x: &Tensor, w: &Tensor, bias: &Tensor, residual: Option<&Tensor>) -> Vec<f32> {
    let (rows, out) = (x.dims()[0], w.dims()[1]);
    let (mut y, _) = reference_matmul(x.as_f32().unwrap(), x.dims(), w.as_f32().unwrap(), w.dims());
    for r in 0..rows {
        for c in 0..out {
            y[r * out + c] += bias.as_f32().unwrap()[c];
        }
    }
    if let Some(res) = residual {
        y.iter_mut()
            .zip(res.as_f32().unwrap())
            .for_each(|(o, &v)| *o += v);
    }
    y
}

#[test]
fn test_fc_single_row() {
    init_logging();
    // 10 channels of 3x3, 15 outputs
    let (x, w, bias) = layer(1, 90, 15, 1);

    let out = fc(&x, &w, &bias, &AffineConfig::default()).unwrap();

    assert_eq!(out.dims(), &[1, 15]);
    assert_close(out.as_f32().unwrap(), &expected(&x, &w, &bias, None), 1e-4);
}

#[test]
fn test_fc_batch_of_two() {
    // 15 channels of 2x2, 48 outputs
    let (x, w, bias) = layer(2, 60, 48, 4);

    let out = fc(&x, &w, &bias, &AffineConfig::default()).unwrap();

    assert_eq!(out.dims(), &[2, 48]);
    assert_close(out.as_f32().unwrap(), &expected(&x, &w, &bias, None), 1e-4);
}

#[test]
fn test_fc_with_residual() {
    let (x, w, bias) = layer(2, 60, 48, 7);
    let residual = Tensor::from_f32([2, 48], uniform(96, 10)).unwrap();

    let config = AffineConfig::new().with_residual(&residual);
    let out = fc(&x, &w, &bias, &config).unwrap();

    assert_close(
        out.as_f32().unwrap(),
        &expected(&x, &w, &bias, Some(&residual)),
        1e-4,
    );
}

#[test]
fn test_fc_from_serialized_attrs() {
    let (x, w, bias) = layer(3, 8, 4, 11);
    let residual = Tensor::from_f32([3, 4], vec![1.0; 12]).unwrap();

    let attrs: AffineAttrs = serde_json::from_str(r#"{"fuse_residual": true}"#).unwrap();
    let config = AffineConfig::from_attrs(&attrs, Some(&residual)).unwrap();
    let out = fc(&x, &w, &bias, &config).unwrap();

    assert_close(
        out.as_f32().unwrap(),
        &expected(&x, &w, &bias, Some(&residual)),
        1e-4,
    );
}

#[test]
fn test_fc_flattens_image_input() {
    // [batch=2, channels=3, 2, 2] flattened to [2, 12]
    let data = uniform(24, 20);
    let x4 = Tensor::from_f32([2, 3, 2, 2], data.clone()).unwrap();
    let x2 = Tensor::from_f32([2, 12], data).unwrap();
    let w = Tensor::from_f32([12, 5], uniform(60, 21)).unwrap();
    let bias = Tensor::from_f32([5], uniform(5, 22)).unwrap();

    let out = fc(&x4, &w, &bias, &AffineConfig::default()).unwrap();

    assert_eq!(out.dims(), &[2, 5]);
    assert_close(out.as_f32().unwrap(), &expected(&x2, &w, &bias, None), 1e-4);
}

#[test]
fn test_fc_rejects_mismatched_weights() {
    let (x, _, bias) = layer(2, 6, 3, 30);
    let w = Tensor::from_f32([5, 3], vec![0.0; 15]).unwrap();

    assert!(matches!(
        fc(&x, &w, &bias, &AffineConfig::default()),
        Err(GemmError::DimensionMismatch(_))
    ));
}

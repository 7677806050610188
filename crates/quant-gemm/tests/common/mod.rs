//! Naive reference algebra shared by the integration tests.
#![allow(dead_code)]

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic values in `[0, 1)`.
pub fn uniform(n: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32) / ((1u64 << 24) as f32)
        })
        .collect()
}

/// Deterministic integers in `lo..=hi`.
pub fn small_ints(n: usize, seed: u64, lo: i32, hi: i32) -> Vec<i32> {
    let span = (hi - lo + 1) as f32;
    uniform(n, seed)
        .into_iter()
        .map(|u| lo + ((u * span) as i32).min(hi - lo))
        .collect()
}

pub fn numel(dims: &[usize]) -> usize {
    dims.iter().product()
}

fn strides(dims: &[usize]) -> Vec<usize> {
    let mut s = vec![1; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        s[i] = s[i + 1] * dims[i + 1];
    }
    s
}

/// Reshape with `0` = copy and `-1` = infer.
pub fn reshape_dims(src: &[usize], target: &[i64]) -> Vec<usize> {
    if target.is_empty() {
        return src.to_vec();
    }
    let mut dims: Vec<usize> = target
        .iter()
        .enumerate()
        .map(|(i, &d)| match d {
            0 => src[i],
            -1 => 1,
            d => d as usize,
        })
        .collect();
    if let Some(i) = target.iter().position(|&d| d == -1) {
        dims[i] = numel(src) / numel(&dims);
    }
    assert_eq!(numel(&dims), numel(src));
    dims
}

/// Copying permutation of a row-major array.
pub fn permute(data: &[f32], dims: &[usize], perm: &[usize]) -> (Vec<f32>, Vec<usize>) {
    let out_dims: Vec<usize> = perm.iter().map(|&p| dims[p]).collect();
    let src_strides = strides(dims);
    let mut out = Vec::with_capacity(data.len());
    let mut idx = vec![0usize; out_dims.len()];
    for _ in 0..data.len() {
        let src: usize = idx
            .iter()
            .zip(perm)
            .map(|(&i, &p)| i * src_strides[p])
            .sum();
        out.push(data[src]);
        for axis in (0..idx.len()).rev() {
            idx[axis] += 1;
            if idx[axis] < out_dims[axis] {
                break;
            }
            idx[axis] = 0;
        }
    }
    (out, out_dims)
}

/// Reshape, permute, then optionally swap the last two axes.
pub fn fold(
    data: &[f32],
    dims: &[usize],
    reshape: &[i64],
    perm: &[usize],
    swap: bool,
) -> (Vec<f32>, Vec<usize>) {
    let dims = reshape_dims(dims, reshape);
    let (data, dims) = if perm.is_empty() {
        (data.to_vec(), dims)
    } else {
        permute(data, &dims, perm)
    };
    if swap {
        let mut p: Vec<usize> = (0..dims.len()).collect();
        let r = dims.len();
        p.swap(r - 1, r - 2);
        permute(&data, &dims, &p)
    } else {
        (data, dims)
    }
}

/// `X · Y` over contiguous operands; batch axes equal or absent on one side.
pub fn reference_matmul(
    x: &[f32],
    xd: &[usize],
    y: &[f32],
    yd: &[usize],
) -> (Vec<f32>, Vec<usize>) {
    let (m, k) = (xd[xd.len() - 2], xd[xd.len() - 1]);
    let (k2, n) = (yd[yd.len() - 2], yd[yd.len() - 1]);
    assert_eq!(k, k2);
    let xb = &xd[..xd.len() - 2];
    let yb = &yd[..yd.len() - 2];
    let batch_dims = if xb.is_empty() { yb } else { xb };
    let batch = numel(batch_dims);

    let mut out = vec![0.0f32; batch * m * n];
    for b in 0..batch {
        let xo = if xb.is_empty() { 0 } else { b * m * k };
        let yo = if yb.is_empty() { 0 } else { b * k * n };
        for i in 0..m {
            for j in 0..n {
                let mut acc = 0.0f64;
                for p in 0..k {
                    acc += x[xo + i * k + p] as f64 * y[yo + p * n + j] as f64;
                }
                out[b * m * n + i * n + j] = acc as f32;
            }
        }
    }
    let mut dims = batch_dims.to_vec();
    dims.extend([m, n]);
    (out, dims)
}

pub fn assert_close(actual: &[f32], expected: &[f32], rel: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let tol = rel * e.abs().max(1.0);
        assert!(
            (a - e).abs() <= tol,
            "element {}: got {}, expected {} (tol {})",
            i,
            a,
            e,
            tol
        );
    }
}

pub fn assert_within(actual: &[f32], expected: &[f32], atol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= atol,
            "element {}: got {}, expected {} (atol {})",
            i,
            a,
            e,
            atol
        );
    }
}

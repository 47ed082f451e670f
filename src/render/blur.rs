use rayon::prelude::*;

use crate::foundation::error::{TextBehindError, TextBehindResult};

/// Kernel radius and sigma for a canvas-style shadow blur of `blur_px`.
///
/// Canvas shadows use a gaussian with a standard deviation of half the blur amount.
pub(crate) fn shadow_blur_params(blur_px: f64) -> (u32, f32) {
    if !blur_px.is_finite() || blur_px <= 0.0 {
        return (0, 0.0);
    }
    let sigma = blur_px / 2.0;
    let radius = (sigma * 3.0).ceil().clamp(1.0, 256.0) as u32;
    (radius, sigma as f32)
}

/// Separable gaussian blur over premultiplied RGBA8, edges clamped.
pub(crate) fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> TextBehindResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| TextBehindError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(TextBehindError::render(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> TextBehindResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(TextBehindError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(TextBehindError::render("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|&wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_exact_mut(row_len)
        .zip(src.par_chunks_exact(row_len))
        .for_each(|(out_row, in_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                    let idx = sx as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(in_row[idx + c]);
                    }
                }
                let o = x as usize * 4;
                for c in 0..4 {
                    out_row[o + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_exact_mut(row_len)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..width as usize {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1);
                    let idx = sy as usize * row_len + x * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    out_row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

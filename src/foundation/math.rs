use crate::foundation::error::{TextBehindError, TextBehindResult};

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255_u8(px[0] as u16, a);
        px[1] = mul_div255_u8(px[1] as u16, a);
        px[2] = mul_div255_u8(px[2] as u16, a);
    }
}

/// Inverse of [`premultiply_rgba8_in_place`], used right before encoding.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            let v = (u32::from(*c) * 255 + a / 2) / a;
            *c = v.min(255) as u8;
        }
    }
}

/// Source-over for premultiplied RGBA8 buffers of equal length.
pub(crate) fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> TextBehindResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(TextBehindError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = s[3] as u16;
        if sa == 0 {
            continue;
        }
        if sa == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - sa;
        d[3] = s[3].saturating_add(mul_div255_u8(d[3] as u16, inv));
        for c in 0..3 {
            let dc = mul_div255_u8(d[c] as u16, inv);
            d[c] = s[c].saturating_add(dc);
        }
    }
    Ok(())
}

use crate::assets::decode::PreparedImage;
use crate::foundation::core::OutputSize;
use crate::foundation::error::{TextBehindError, TextBehindResult};

/// A rendered frame as RGBA8 pixels.
///
/// Frames produced by the compositor are premultiplied; the flag keeps that explicit at API
/// boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub(crate) fn transparent(size: OutputSize) -> TextBehindResult<Self> {
        let len = (size.width as usize)
            .checked_mul(size.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| TextBehindError::render("frame size overflow"))?;
        Ok(Self {
            width: size.width,
            height: size.height,
            data: vec![0; len],
            premultiplied: true,
        })
    }

    pub(crate) fn from_image(img: &PreparedImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            data: img.rgba8_premul.as_ref().clone(),
            premultiplied: true,
        }
    }

    pub fn size(&self) -> OutputSize {
        OutputSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Raster dimensions accepted by `vello_cpu`.
pub(crate) fn pixmap_dims(size: OutputSize) -> TextBehindResult<(u16, u16)> {
    let w = u16::try_from(size.width).map_err(|_| {
        TextBehindError::render(format!("output width {} exceeds raster limit", size.width))
    })?;
    let h = u16::try_from(size.height).map_err(|_| {
        TextBehindError::render(format!(
            "output height {} exceeds raster limit",
            size.height
        ))
    })?;
    Ok((w, h))
}

pub(crate) fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

pub(crate) fn fill_premul(buf: &mut [u8], rgba_premul: [u8; 4]) {
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba_premul);
    }
}

/// Multiply every channel of a premultiplied buffer by `opacity`.
pub(crate) fn scale_alpha_in_place(buf: &mut [u8], opacity: f32) {
    if opacity >= 1.0 {
        return;
    }
    let k = (opacity.clamp(0.0, 1.0) * 255.0).round() as u16;
    for c in buf.iter_mut() {
        *c = crate::foundation::math::mul_div255_u8(u16::from(*c), k);
    }
}

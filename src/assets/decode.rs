use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::core::OutputSize;
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Wrap straight-alpha RGBA8 pixels, premultiplying them.
    pub fn from_straight_rgba8(
        width: u32,
        height: u32,
        mut rgba8: Vec<u8>,
    ) -> TextBehindResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| TextBehindError::image_decode("image dimensions overflow"))?;
        if rgba8.len() != expected {
            return Err(TextBehindError::image_decode(format!(
                "pixel buffer is {} bytes, expected {expected} for {width}x{height}",
                rgba8.len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba8);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8),
        })
    }

    pub fn size(&self) -> TextBehindResult<OutputSize> {
        OutputSize::new(self.width, self.height)
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.rgba8_premul.as_ref().clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }

    /// Stretch to `width`x`height`. Filtering happens on premultiplied data so transparent
    /// edges do not bleed color.
    pub fn resized(&self, width: u32, height: u32) -> TextBehindResult<Self> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let buf = image::RgbaImage::from_raw(
            self.width,
            self.height,
            self.rgba8_premul.as_ref().clone(),
        )
        .ok_or_else(|| TextBehindError::image_decode("image buffer does not match dimensions"))?;
        let out = image::imageops::resize(
            &buf,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(out.into_raw()),
        })
    }
}

/// Where image bytes come from.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Arc<Vec<u8>>),
    /// Already decoded; loading is a no-op.
    Decoded(PreparedImage),
}

impl ImageSource {
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(Arc::new(b.into()))
    }

    /// Load and decode, blocking until the image is fully available.
    pub fn load(&self) -> TextBehindResult<PreparedImage> {
        match self {
            Self::Path(p) => load_image_file(p),
            Self::Bytes(b) => decode_image(b),
            Self::Decoded(img) => Ok(img.clone()),
        }
    }
}

impl From<PreparedImage> for ImageSource {
    fn from(img: PreparedImage) -> Self {
        Self::Decoded(img)
    }
}

pub fn decode_image(bytes: &[u8]) -> TextBehindResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| TextBehindError::image_decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(TextBehindError::image_decode("image has zero size"));
    }
    PreparedImage::from_straight_rgba8(width, height, rgba.into_raw())
}

pub fn load_image_file(path: &Path) -> TextBehindResult<PreparedImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        TextBehindError::image_decode(format!("read image '{}': {e}", path.display()))
    })?;
    decode_image(&bytes).map_err(|e| match e {
        TextBehindError::ImageDecodeFailed(msg) => {
            TextBehindError::image_decode(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;

use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;
use crate::render::surface::FrameRGBA;

/// Suggested file name handed to the export sink.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "text-behind-image.png";

/// Encoded raster format of an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }
}

/// Export settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOpts {
    pub format: ExportFormat,
    pub file_name: String,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
        }
    }
}

/// An encoded image plus the name it should be saved under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

/// Encode a rendered frame. Premultiplied frames are converted to straight alpha first.
pub fn encode_frame(frame: &FrameRGBA, opts: &ExportOpts) -> TextBehindResult<EncodedImage> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() != expected {
        return Err(TextBehindError::render(format!(
            "frame has {} bytes, expected {expected}",
            frame.data.len()
        )));
    }

    let mut straight = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut straight);
    }

    let mut bytes = Vec::new();
    match opts.format {
        ExportFormat::Png => {
            use image::ImageEncoder as _;
            image::codecs::png::PngEncoder::new(&mut bytes)
                .write_image(
                    &straight,
                    frame.width,
                    frame.height,
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(|e| TextBehindError::render(format!("encode png: {e}")))?;
        }
    }

    let file_name = if opts.file_name.trim().is_empty() {
        DEFAULT_EXPORT_FILE_NAME.to_string()
    } else {
        opts.file_name.clone()
    };
    tracing::debug!(bytes = bytes.len(), %file_name, "encoded export");
    Ok(EncodedImage {
        bytes,
        file_name,
        format: opts.format,
        width: frame.width,
        height: frame.height,
    })
}

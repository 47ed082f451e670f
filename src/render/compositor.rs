use crate::assets::decode::{ImageSource, PreparedImage};
use crate::assets::fonts::FontBook;
use crate::foundation::core::{PreviewBox, Rgba8Premul};
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::foundation::math::premul_over_in_place;
use crate::geometry::mapper::to_output_pixels;
use crate::layers::model::TextLayer;
use crate::render::surface::{FrameRGBA, fill_premul, pixmap_dims};
use crate::render::text::TextRasterizer;

/// Compositor settings.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositorOpts {
    /// Draw blurred text shadows. Off by default so exports match the plain preview text.
    pub render_shadows: bool,
    /// If set, the frame is cleared to this straight-alpha RGBA8 color before the background.
    pub clear_rgba: Option<[u8; 4]>,
}

/// Everything one export composes, borrowed from the caller.
#[derive(Clone, Copy, Debug)]
pub struct ExportScene<'a> {
    pub source: Option<&'a ImageSource>,
    pub cutout: Option<&'a ImageSource>,
    pub layers: &'a [TextLayer],
    /// Preview container size at export time; drives position and size scaling.
    pub preview: Option<PreviewBox>,
}

/// Builds the exported image: background, then text layers in order, then the cutout on top.
///
/// The output always has the source image's native resolution.
pub struct Compositor {
    opts: CompositorOpts,
    text: TextRasterizer,
}

impl Compositor {
    pub fn new(opts: CompositorOpts, fonts: FontBook) -> Self {
        Self {
            opts,
            text: TextRasterizer::new(fonts),
        }
    }

    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    pub fn fonts(&self) -> &FontBook {
        self.text.fonts()
    }

    /// Compose `scene` into a premultiplied frame.
    ///
    /// Preconditions are checked before anything is decoded or allocated. Source and cutout are
    /// decoded concurrently and both must be available before drawing starts.
    ///
    /// Text is rasterized on surfaces of at most 65535 pixels per axis. A larger source with any
    /// layers fails with [`TextBehindError::Render`] before the first layer is drawn; without
    /// layers it composes normally.
    #[tracing::instrument(skip(self, scene), fields(layers = scene.layers.len()))]
    pub fn compose(&mut self, scene: &ExportScene<'_>) -> TextBehindResult<FrameRGBA> {
        let source = scene
            .source
            .ok_or_else(|| TextBehindError::export_precondition("no source image loaded"))?;
        let preview = match scene.preview {
            Some(p) if p.is_measurable() => p,
            Some(p) => {
                return Err(TextBehindError::export_precondition(format!(
                    "preview box is not measurable ({}x{})",
                    p.width, p.height
                )));
            }
            None => {
                return Err(TextBehindError::export_precondition(
                    "preview box has not been measured",
                ));
            }
        };

        let (source, cutout) = rayon::join(
            || source.load(),
            || scene.cutout.map(ImageSource::load).transpose(),
        );
        let source = source?;
        let cutout = cutout?;
        let output = source.size()?;
        if !scene.layers.is_empty() {
            pixmap_dims(output)?;
        }

        let mut frame = match self.opts.clear_rgba {
            Some([r, g, b, a]) => {
                let mut f = FrameRGBA::transparent(output)?;
                let Rgba8Premul { r, g, b, a } = Rgba8Premul::from_straight_rgba(r, g, b, a);
                fill_premul(&mut f.data, [r, g, b, a]);
                premul_over_in_place(&mut f.data, &source.rgba8_premul)?;
                f
            }
            None => FrameRGBA::from_image(&source),
        };

        for layer in scene.layers {
            let placement = to_output_pixels(layer, preview, output);
            tracing::trace!(
                id = %layer.id,
                x = placement.position.x,
                y = placement.position.y,
                font_size = placement.font_size,
                "drawing layer"
            );
            self.text
                .draw_layer(layer, &placement, &mut frame, self.opts.render_shadows)?;
        }

        if let Some(cutout) = cutout {
            let cutout = fit_to(cutout, output.width, output.height)?;
            premul_over_in_place(&mut frame.data, &cutout.rgba8_premul)?;
        } else {
            tracing::debug!("no cutout; text is not occluded");
        }

        Ok(frame)
    }
}

fn fit_to(img: PreparedImage, width: u32, height: u32) -> TextBehindResult<PreparedImage> {
    if img.width == width && img.height == height {
        return Ok(img);
    }
    tracing::debug!(
        from_w = img.width,
        from_h = img.height,
        width,
        height,
        "scaling cutout to source size"
    );
    img.resized(width, height)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;

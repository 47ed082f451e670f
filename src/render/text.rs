use crate::assets::fonts::{FontBook, ShapedText, TextBrushRgba8, TextLayoutEngine};
use crate::foundation::core::{Affine, OutputSize, Vec2};
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::foundation::math::premul_over_in_place;
use crate::geometry::mapper::OutputPlacement;
use crate::layers::color::Color;
use crate::layers::model::TextLayer;
use crate::render::blur::{blur_rgba8_premul, shadow_blur_params};
use crate::render::surface::{
    FrameRGBA, clear_pixmap_to_transparent, pixmap_dims, scale_alpha_in_place,
};

/// Draws text layers onto an output frame with `vello_cpu`.
///
/// The render context and scratch pixmap are reused across layers and exports of the same size.
pub(crate) struct TextRasterizer {
    engine: TextLayoutEngine,
    ctx: Option<vello_cpu::RenderContext>,
    scratch: Option<vello_cpu::Pixmap>,
}

impl TextRasterizer {
    pub(crate) fn new(fonts: FontBook) -> Self {
        Self {
            engine: TextLayoutEngine::new(fonts),
            ctx: None,
            scratch: None,
        }
    }

    pub(crate) fn fonts(&self) -> &FontBook {
        self.engine.book()
    }

    /// Draw one layer centered on `placement.position`, rotated about that point.
    pub(crate) fn draw_layer(
        &mut self,
        layer: &TextLayer,
        placement: &OutputPlacement,
        dst: &mut FrameRGBA,
        render_shadow: bool,
    ) -> TextBehindResult<()> {
        let opacity = layer.opacity.clamp(0.0, 1.0) as f32;
        if layer.text.is_empty() || opacity <= 0.0 {
            return Ok(());
        }
        let size_px = placement.font_size as f32;
        if !size_px.is_finite() || size_px <= 0.0 {
            tracing::debug!(id = %layer.id, size_px, "skipping layer with empty font size");
            return Ok(());
        }

        let shaped = self.engine.layout(
            &layer.text,
            &layer.font_family,
            layer.font_weight,
            size_px,
            brush(layer.color),
        )?;
        let transform = Affine::translate(placement.position.to_vec2())
            * Affine::rotate(placement.rotation_rad)
            * Affine::translate(Vec2::new(
                -f64::from(shaped.width()) / 2.0,
                -f64::from(shaped.height()) / 2.0,
            ));

        let size = dst.size();
        if render_shadow && layer.shadow_color.a > 0 && placement.shadow_size > 0.0 {
            let (radius, sigma) = shadow_blur_params(placement.shadow_size);
            let mut shadow =
                self.rasterize(&shaped, transform, Some(layer.shadow_color), 1.0, size)?;
            shadow = blur_rgba8_premul(&shadow, size.width, size.height, radius, sigma)?;
            scale_alpha_in_place(&mut shadow, opacity);
            premul_over_in_place(&mut dst.data, &shadow)?;
        }

        let fill = self.rasterize(&shaped, transform, None, opacity, size)?;
        premul_over_in_place(&mut dst.data, &fill)
    }

    fn rasterize(
        &mut self,
        shaped: &ShapedText,
        transform: Affine,
        paint_override: Option<Color>,
        opacity: f32,
        size: OutputSize,
    ) -> TextBehindResult<Vec<u8>> {
        let (w, h) = pixmap_dims(size)?;
        let mut pixmap = match self.scratch.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        clear_pixmap_to_transparent(&mut pixmap);

        self.with_ctx_mut(w, h, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity);
            }
            for line in shaped.layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let c = match paint_override {
                        Some(c) => c,
                        None => {
                            let b = run.style().brush;
                            Color::rgba(b.r, b.g, b.b, b.a)
                        }
                    };
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&shaped.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
            if opacity < 1.0 {
                ctx.pop_layer();
            }
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
        });

        let out = pixmap.data_as_u8_slice().to_vec();
        self.scratch = Some(pixmap);
        if out.len() != size.width as usize * size.height as usize * 4 {
            return Err(TextBehindError::render("text raster has unexpected size"));
        }
        Ok(out)
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> R,
    ) -> R {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(&mut ctx);
        self.ctx = Some(ctx);
        out
    }
}

fn brush(c: Color) -> TextBrushRgba8 {
    TextBrushRgba8 {
        r: c.r,
        g: c.g,
        b: c.b,
        a: c.a,
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;

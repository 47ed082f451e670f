use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{TextBehindError, TextBehindResult};

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// One face of a registered font file.
#[derive(Clone, Debug)]
pub struct FontFace {
    pub family: String,
    pub weight: u16,
    /// Face index within a collection file (0 for plain TTF/OTF).
    pub index: u32,
    bytes: Arc<Vec<u8>>,
}

/// Fonts available to text layers, looked up by family name and weight.
///
/// Family names are matched case-insensitively. When a layer names a family that was never
/// registered, the first registered family stands in for it so the layer still renders.
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    faces: Vec<FontFace>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every face found in `bytes`. Returns how many faces were added.
    pub fn register_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> TextBehindResult<usize> {
        let bytes = Arc::new(bytes.into());
        let mut probe = parley::FontContext::default();
        let families = probe
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);

        let mut added = 0usize;
        for (family_id, infos) in families {
            let Some(name) = probe.collection.family_name(family_id) else {
                continue;
            };
            for info in infos {
                self.faces.push(FontFace {
                    family: name.to_string(),
                    weight: info.weight().value().round().clamp(1.0, 1000.0) as u16,
                    index: info.index(),
                    bytes: bytes.clone(),
                });
                added += 1;
            }
        }

        if added == 0 {
            return Err(TextBehindError::validation(
                "no font faces found in font bytes",
            ));
        }
        tracing::debug!(added, total = self.faces.len(), "registered font faces");
        Ok(added)
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) -> TextBehindResult<usize> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            TextBehindError::validation(format!("read font '{}': {e}", path.display()))
        })?;
        self.register_bytes(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn faces(&self) -> &[FontFace] {
        &self.faces
    }

    /// Distinct family names in registration order.
    pub fn families(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for f in &self.faces {
            if !out.iter().any(|n| n.eq_ignore_ascii_case(&f.family)) {
                out.push(&f.family);
            }
        }
        out
    }

    /// Slot of the face that best matches `family` and `weight`.
    ///
    /// Within a family the closest weight wins, ties going to the heavier face.
    pub fn resolve(&self, family: &str, weight: u16) -> Option<usize> {
        let family = family.trim();
        let exact = self.closest_in_family(family, weight);
        if exact.is_some() {
            return exact;
        }
        let fallback = self.faces.first()?.family.as_str();
        tracing::warn!(requested = family, fallback, "font family not registered");
        self.closest_in_family(fallback, weight)
    }

    fn closest_in_family(&self, family: &str, weight: u16) -> Option<usize> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.family.eq_ignore_ascii_case(family))
            .min_by_key(|(_, f)| {
                let d = (i32::from(f.weight) - i32::from(weight)).unsigned_abs();
                (d, std::cmp::Reverse(f.weight))
            })
            .map(|(i, _)| i)
    }
}

/// Shaped text ready to be rasterized with the face it was shaped with.
pub(crate) struct ShapedText {
    pub(crate) layout: parley::Layout<TextBrushRgba8>,
    pub(crate) font: vello_cpu::peniko::FontData,
}

impl ShapedText {
    pub(crate) fn width(&self) -> f32 {
        self.layout.width()
    }

    pub(crate) fn height(&self) -> f32 {
        self.layout.height()
    }
}

struct FaceContext {
    font_ctx: parley::FontContext,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl FaceContext {
    fn new(face: &FontFace) -> TextBehindResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(face.bytes.as_ref().clone()), None);
        if families.is_empty() {
            return Err(TextBehindError::render(format!(
                "font face '{}' could not be registered",
                face.family
            )));
        }
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(face.bytes.as_ref().clone()),
            face.index,
        );
        Ok(Self {
            font_ctx,
            family_name: face.family.clone(),
            font,
        })
    }
}

/// Stateful helper for building Parley layouts against a [`FontBook`].
///
/// Each face gets its own font context holding only that face's file, so the glyph ids in a
/// layout always belong to the face handed to the rasterizer.
pub(crate) struct TextLayoutEngine {
    book: FontBook,
    faces: Vec<Option<FaceContext>>,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl TextLayoutEngine {
    pub(crate) fn new(book: FontBook) -> Self {
        let faces = std::iter::repeat_with(|| None).take(book.len()).collect();
        Self {
            book,
            faces,
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    pub(crate) fn book(&self) -> &FontBook {
        &self.book
    }

    /// Shape a single block of text, centered later by the caller using its measured box.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        family: &str,
        weight: u16,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> TextBehindResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(TextBehindError::render(
                "text size_px must be finite and > 0",
            ));
        }
        let slot = self
            .book
            .resolve(family, weight)
            .ok_or_else(|| TextBehindError::render("no fonts registered"))?;

        if self.faces[slot].is_none() {
            let ctx = FaceContext::new(&self.book.faces[slot])?;
            self.faces[slot] = Some(ctx);
        }
        let face_weight = self.book.faces[slot].weight;
        let face = self.faces[slot]
            .as_mut()
            .ok_or_else(|| TextBehindError::render("font face context missing"))?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut face.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(face.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(face_weight)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        Ok(ShapedText {
            layout,
            font: face.font.clone(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;

//! Conversions between the three coordinate spaces a layer passes through.
//!
//! - **Normalized space**: `(left, top)` in `[-50, 50]²`, origin at the image center, y up.
//! - **Preview space**: CSS pixels inside the preview container, origin top-left, y down.
//! - **Output space**: pixels of the exported image (the source image's native size).
//!
//! All functions here are pure. Callers are expected to pass a measurable [`PreviewBox`]; a
//! degenerate box yields non-finite coordinates rather than an error.

use crate::foundation::core::{OutputSize, Point, PreviewBox};
use crate::layers::model::TextLayer;

/// A position in centered normalized space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedPos {
    pub left: f64,
    pub top: f64,
}

impl NormalizedPos {
    pub const fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }

    /// Convert a percentage-of-box position (`0..=100`, y down) into centered space.
    pub fn from_percent(percent_x: f64, percent_y: f64) -> Self {
        Self {
            left: percent_x - 50.0,
            top: 50.0 - percent_y,
        }
    }

    /// Inverse of [`NormalizedPos::from_percent`].
    pub fn to_percent(self) -> (f64, f64) {
        (self.left + 50.0, 50.0 - self.top)
    }
}

/// Where and how large a layer appears in the preview.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PreviewPlacement {
    pub position: Point,
    /// Passed through unscaled: the preview renders at CSS pixel sizes directly.
    pub font_size: f64,
    pub shadow_size: f64,
}

/// Where and how large a layer is drawn in the exported image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct OutputPlacement {
    pub position: Point,
    pub font_size: f64,
    pub shadow_size: f64,
    pub rotation_rad: f64,
    pub scale: f64,
}

/// Inverse of the preview's contain fit: maps preview pixels onto output pixels.
///
/// When the preview is relatively wider than the image, heights line up and the image is
/// pillarboxed (`offset_x` > 0); otherwise widths line up and it is letterboxed (`offset_y` > 0).
/// Equal aspect ratios take the width branch.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ContainFit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ContainFit {
    pub fn new(preview: PreviewBox, output: OutputSize) -> Self {
        let out_w = f64::from(output.width);
        let out_h = f64::from(output.height);
        if preview.aspect() > output.aspect() {
            let scale = out_h / preview.height;
            Self {
                scale,
                offset_x: (preview.width - out_w / scale) / 2.0,
                offset_y: 0.0,
            }
        } else {
            let scale = out_w / preview.width;
            Self {
                scale,
                offset_x: 0.0,
                offset_y: (preview.height - out_h / scale) / 2.0,
            }
        }
    }

    pub fn preview_to_output(self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset_x) * self.scale,
            (p.y - self.offset_y) * self.scale,
        )
    }
}

/// Normalized position to preview pixels.
pub fn normalized_to_preview(pos: NormalizedPos, preview: PreviewBox) -> Point {
    Point::new(
        preview.width * (pos.left + 50.0) / 100.0,
        preview.height * (50.0 - pos.top) / 100.0,
    )
}

/// Layer placement inside the preview container.
pub fn to_preview_pixels(layer: &TextLayer, preview: PreviewBox) -> PreviewPlacement {
    PreviewPlacement {
        position: normalized_to_preview(NormalizedPos::new(layer.left, layer.top), preview),
        font_size: layer.font_size,
        shadow_size: layer.shadow_size,
    }
}

/// Layer placement in the exported image, given the preview geometry at export time.
pub fn to_output_pixels(
    layer: &TextLayer,
    preview: PreviewBox,
    output: OutputSize,
) -> OutputPlacement {
    let fit = ContainFit::new(preview, output);
    let preview_pos = normalized_to_preview(NormalizedPos::new(layer.left, layer.top), preview);
    OutputPlacement {
        position: fit.preview_to_output(preview_pos),
        font_size: layer.font_size * fit.scale,
        shadow_size: layer.shadow_size * fit.scale,
        rotation_rad: layer.rotation.to_radians(),
        scale: fit.scale,
    }
}

/// Pointer position (box-local pixels) to unclamped percentage-of-box coordinates.
pub fn pointer_to_percent(pointer: Point, preview: PreviewBox) -> (f64, f64) {
    (
        pointer.x / preview.width * 100.0,
        pointer.y / preview.height * 100.0,
    )
}

/// Clamp a percentage into `[0, 100]`.
pub fn clamp_percent(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Inverse of [`normalized_to_preview`].
///
/// Percentages are clamped to `[0, 100]` before inversion so a pointer released outside the
/// container still lands on the image edge.
pub fn from_pointer(pointer: Point, preview: PreviewBox) -> NormalizedPos {
    let (px, py) = pointer_to_percent(pointer, preview);
    NormalizedPos::from_percent(clamp_percent(px), clamp_percent(py))
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/mapper.rs"]
mod tests;

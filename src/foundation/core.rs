use crate::foundation::error::{TextBehindError, TextBehindResult};

pub use kurbo::{Affine, Point, Vec2};

/// Rendered size of the on-screen preview container, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreviewBox {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl PreviewBox {
    /// Create a preview box without validation.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Return `true` when both dimensions are finite and strictly positive.
    pub fn is_measurable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Return the box unchanged when it is measurable, otherwise a validation error.
    pub fn measured(self) -> TextBehindResult<Self> {
        if !self.is_measurable() {
            return Err(TextBehindError::validation(format!(
                "preview box must have finite, positive size (got {}x{})",
                self.width, self.height
            )));
        }
        Ok(self)
    }

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        self.width / self.height
    }
}

/// Native pixel dimensions of the source image, which is also the export resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl OutputSize {
    /// Create an output size, rejecting empty dimensions.
    pub fn new(width: u32, height: u32) -> TextBehindResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextBehindError::validation(
                "output size width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Bounding box of the image as rendered inside the viewport.
///
/// With a contain fit the image may be letterboxed, so this is generally smaller than the preview
/// container and offset from its top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageRect {
    /// Top-left corner in viewport coordinates.
    pub origin: Point,
    /// Rendered size.
    pub size: PreviewBox,
}

impl ImageRect {
    /// Create an image rect from its top-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: PreviewBox::new(width, height),
        }
    }

    /// Translate a viewport point into rect-local coordinates.
    pub fn to_local(self, viewport: Point) -> Point {
        Point::new(viewport.x - self.origin.x, viewport.y - self.origin.y)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

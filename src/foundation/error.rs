use crate::layers::model::LayerId;

/// Convenience result type used across textbehind.
pub type TextBehindResult<T> = Result<T, TextBehindError>;

/// Top-level error taxonomy used by editor and export APIs.
///
/// None of these errors invalidate an [`crate::EditorSession`]: the layer collection and any loaded
/// images remain usable after a failure is reported.
#[derive(thiserror::Error, Debug)]
pub enum TextBehindError {
    /// Invalid caller-provided data (attribute values, scene files, geometry).
    #[error("validation error: {0}")]
    Validation(String),

    /// A layer operation referenced an id that is not in the collection.
    #[error("layer {0} not found")]
    LayerNotFound(LayerId),

    /// The background-removal collaborator rejected the image.
    #[error("background removal failed: {0}")]
    RemovalFailed(String),

    /// A source, cutout or export-time image could not be decoded.
    #[error("image decode failed: {0}")]
    ImageDecodeFailed(String),

    /// Export was requested without a source image or a measurable preview box.
    #[error("export precondition missing: {0}")]
    ExportPreconditionMissing(String),

    /// Rasterization failed (surface allocation, font resolution, text shaping).
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TextBehindError {
    /// Build a [`TextBehindError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TextBehindError::RemovalFailed`] value.
    pub fn removal_failed(msg: impl Into<String>) -> Self {
        Self::RemovalFailed(msg.into())
    }

    /// Build a [`TextBehindError::ImageDecodeFailed`] value.
    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecodeFailed(msg.into())
    }

    /// Build a [`TextBehindError::ExportPreconditionMissing`] value.
    pub fn export_precondition(msg: impl Into<String>) -> Self {
        Self::ExportPreconditionMissing(msg.into())
    }

    /// Build a [`TextBehindError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`TextBehindError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

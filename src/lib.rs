//! textbehind composites editable text layers *behind* the subject of a photo.
//!
//! A background-removal collaborator cuts the subject out of the source image; the compositor then
//! draws the source, every text layer, and finally the cutout on top, at the source's native
//! resolution. The public API is session-oriented:
//!
//! - Create an [`EditorSession`] with [`EditorOpts`] and a [`FontBook`]
//! - Load an image with an optional [`BackgroundRemover`] and merge its result when it arrives
//! - Edit layers through the four layer operations, numeric position edits and drag
//!   [`GestureCommand`]s
//! - Export through an [`ExportSink`]
//!
//! Layer positions live in a centered normalized space (`[-50, 50]` on both axes, y up) so they
//! survive any preview size; the [`ContainFit`] mapping carries them from the on-screen preview to
//! output pixels.
#![forbid(unsafe_code)]

mod assets;
mod export;
mod foundation;
mod geometry;
mod gesture;
mod layers;
mod removal;
mod render;
mod scene;
mod session;

pub use crate::foundation::core::{
    Affine, ImageRect, OutputSize, Point, PreviewBox, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{TextBehindError, TextBehindResult};

pub use crate::assets::decode::{ImageSource, PreparedImage, decode_image, load_image_file};
pub use crate::assets::fonts::{FontBook, FontFace};
pub use crate::export::encode::{
    DEFAULT_EXPORT_FILE_NAME, EncodedImage, ExportFormat, ExportOpts, encode_frame,
};
pub use crate::export::sink::{ExportSink, FileSink, InMemorySink};
pub use crate::geometry::mapper::{
    ContainFit, NormalizedPos, OutputPlacement, PreviewPlacement, clamp_percent, from_pointer,
    normalized_to_preview, pointer_to_percent, to_output_pixels, to_preview_pixels,
};
pub use crate::gesture::grid::{DEFAULT_GRID_SIZE, PositionAxis, position_edit, snap_to_grid};
pub use crate::gesture::handler::{
    DEFAULT_DAMPENING, DragState, GestureCommand, GestureHandler, GestureOutcome,
    drag_end_position,
};
pub use crate::layers::color::Color;
pub use crate::layers::model::{LayerAttr, LayerDefaults, LayerId, LayerStack, TextLayer};
pub use crate::removal::job::{ImagePairId, RemovalJob, RemovalOutcome};
pub use crate::removal::remover::{
    BackgroundRemover, CommandRemover, FileCutout, is_program_on_path,
};
pub use crate::render::compositor::{Compositor, CompositorOpts, ExportScene};
pub use crate::render::surface::FrameRGBA;
pub use crate::scene::model::SceneDef;
pub use crate::session::editor::{
    EditorOpts, EditorSession, ImagePair, LayerPlacement, RemovalStatus,
};

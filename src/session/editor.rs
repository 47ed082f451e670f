use std::sync::Arc;

use crate::assets::decode::{ImageSource, PreparedImage};
use crate::assets::fonts::FontBook;
use crate::export::encode::{EncodedImage, ExportOpts, encode_frame};
use crate::export::sink::ExportSink;
use crate::foundation::core::{ImageRect, OutputSize, PreviewBox};
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::geometry::mapper::{
    OutputPlacement, PreviewPlacement, to_output_pixels, to_preview_pixels,
};
use crate::gesture::grid::{DEFAULT_GRID_SIZE, PositionAxis, position_edit};
use crate::gesture::handler::{
    DEFAULT_DAMPENING, DragState, GestureCommand, GestureHandler, GestureOutcome,
};
use crate::layers::model::{LayerAttr, LayerDefaults, LayerId, LayerStack, TextLayer};
use crate::removal::job::{ImagePairId, RemovalJob, RemovalOutcome};
use crate::removal::remover::BackgroundRemover;
use crate::render::compositor::{Compositor, CompositorOpts, ExportScene};
use crate::render::surface::FrameRGBA;

/// Editor configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOpts {
    /// Fraction of drag release velocity applied as momentum.
    pub dampening: f64,
    /// Grid step for numeric position edits, in percent.
    pub grid_size: f64,
    pub layer_defaults: LayerDefaults,
    pub compositor: CompositorOpts,
    pub export: ExportOpts,
}

impl Default for EditorOpts {
    fn default() -> Self {
        Self {
            dampening: DEFAULT_DAMPENING,
            grid_size: DEFAULT_GRID_SIZE,
            layer_defaults: LayerDefaults::default(),
            compositor: CompositorOpts::default(),
            export: ExportOpts::default(),
        }
    }
}

/// The working image: the uploaded source and, once removal resolves, its cutout.
#[derive(Clone, Debug)]
pub struct ImagePair {
    pub id: ImagePairId,
    pub source: PreparedImage,
    pub cutout: Option<PreparedImage>,
}

impl ImagePair {
    pub fn output_size(&self) -> TextBehindResult<OutputSize> {
        self.source.size()
    }
}

/// Where background removal stands after a poll or wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemovalStatus {
    /// No removal has been started for the current image.
    Idle,
    Pending(ImagePairId),
    /// The cutout was merged into the current pair.
    Applied(ImagePairId),
    /// Removal failed; editing continues without a cutout.
    Failed { pair: ImagePairId, message: String },
    /// The result belonged to an image that has since been replaced.
    Discarded(ImagePairId),
}

/// Preview and output placement of one layer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct LayerPlacement {
    pub id: LayerId,
    pub preview: PreviewPlacement,
    pub output: OutputPlacement,
}

/// Explicit editing context: layers, gesture state, the image pair and its pending removal.
///
/// Every failure is reported to the caller and leaves the session usable. Background removal
/// results are merged into whatever state the session is in when they arrive, so layer edits
/// made in the meantime are kept.
pub struct EditorSession {
    opts: EditorOpts,
    layers: LayerStack,
    gestures: GestureHandler,
    image: Option<ImagePair>,
    next_pair: u64,
    removal: Option<RemovalJob>,
    compositor: Compositor,
    notices: Vec<String>,
}

impl EditorSession {
    pub fn new(opts: EditorOpts, fonts: FontBook) -> Self {
        let gestures = GestureHandler::new(opts.dampening);
        let compositor = Compositor::new(opts.compositor.clone(), fonts);
        Self {
            opts,
            layers: LayerStack::new(),
            gestures,
            image: None,
            next_pair: 0,
            removal: None,
            compositor,
            notices: Vec::new(),
        }
    }

    pub fn opts(&self) -> &EditorOpts {
        &self.opts
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn image(&self) -> Option<&ImagePair> {
        self.image.as_ref()
    }

    pub fn fonts(&self) -> &FontBook {
        self.compositor.fonts()
    }

    pub fn drag_state(&self) -> DragState {
        self.gestures.state()
    }

    /// User-facing messages about recovered failures, oldest first.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn add_layer(&mut self) -> LayerId {
        self.layers.add_layer(&self.opts.layer_defaults)
    }

    pub fn update_attribute(&mut self, id: LayerId, attr: LayerAttr) -> TextBehindResult<()> {
        self.layers.update_attribute(id, attr)
    }

    /// UI entry point taking the attribute by name with a JSON value.
    pub fn update_attribute_json(
        &mut self,
        id: LayerId,
        name: &str,
        value: serde_json::Value,
    ) -> TextBehindResult<()> {
        let attr = LayerAttr::from_json(name, value)?;
        self.layers.update_attribute(id, attr)
    }

    pub fn duplicate_layer(&mut self, id: LayerId) -> TextBehindResult<LayerId> {
        self.layers.duplicate_layer(id)
    }

    pub fn remove_layer(&mut self, id: LayerId) -> TextBehindResult<TextLayer> {
        let removed = self.layers.remove_layer(id)?;
        self.gestures.release(id);
        Ok(removed)
    }

    /// Numeric position edit in percent of the image (y down), snapped to the grid.
    pub fn set_position_percent(
        &mut self,
        id: LayerId,
        axis: PositionAxis,
        percent: f64,
    ) -> TextBehindResult<()> {
        let attr = position_edit(axis, percent, self.opts.grid_size);
        self.layers.update_attribute(id, attr)
    }

    /// Feed one drag command; `image` is the image's rendered bounding box in the viewport.
    pub fn apply_gesture(
        &mut self,
        image: ImageRect,
        cmd: GestureCommand,
    ) -> TextBehindResult<GestureOutcome> {
        self.gestures.apply(&mut self.layers, image, cmd)
    }

    /// Placement of every layer for the given preview box, in draw order.
    pub fn placements(&self, preview: PreviewBox) -> TextBehindResult<Vec<LayerPlacement>> {
        let preview = preview.measured()?;
        let output = match &self.image {
            Some(pair) => pair.output_size()?,
            None => {
                return Err(TextBehindError::export_precondition(
                    "no source image loaded",
                ));
            }
        };
        Ok(self
            .layers
            .iter()
            .map(|l| LayerPlacement {
                id: l.id,
                preview: to_preview_pixels(l, preview),
                output: to_output_pixels(l, preview, output),
            })
            .collect())
    }

    /// Make `source` the working image and optionally start background removal for it.
    ///
    /// The source is decoded before anything changes; if that fails the previous pair stays in
    /// place. Any removal still running for the previous pair is detached and its result will be
    /// ignored.
    #[tracing::instrument(skip(self, source, remover))]
    pub fn load_image(
        &mut self,
        source: ImageSource,
        remover: Option<Arc<dyn BackgroundRemover>>,
    ) -> TextBehindResult<ImagePairId> {
        let prepared = source.load().inspect_err(|e| {
            tracing::warn!(error = %e, "source image could not be loaded");
        })?;

        self.next_pair += 1;
        let id = ImagePairId(self.next_pair);
        if let Some(old) = self.removal.take() {
            tracing::debug!(old = %old.pair(), new = %id, "detaching removal for replaced image");
        }
        self.image = Some(ImagePair {
            id,
            source: prepared.clone(),
            cutout: None,
        });
        tracing::info!(
            pair = %id,
            width = prepared.width,
            height = prepared.height,
            "image loaded"
        );

        if let Some(remover) = remover {
            match RemovalJob::spawn(id, prepared, remover) {
                Ok(job) => self.removal = Some(job),
                Err(e) => {
                    self.apply_removal(RemovalOutcome {
                        pair: id,
                        result: Err(e),
                    });
                }
            }
        }
        Ok(id)
    }

    pub fn removal_pending(&self) -> bool {
        self.removal.is_some()
    }

    /// Merge a finished removal if one is ready, without blocking.
    pub fn poll_removal(&mut self) -> RemovalStatus {
        let Some(job) = self.removal.as_mut() else {
            return RemovalStatus::Idle;
        };
        match job.try_take() {
            None => RemovalStatus::Pending(job.pair()),
            Some(outcome) => {
                self.removal = None;
                self.apply_removal(outcome)
            }
        }
    }

    /// Block until the running removal finishes and merge its result.
    pub fn wait_removal(&mut self) -> RemovalStatus {
        match self.removal.take() {
            Some(job) => {
                let outcome = job.wait();
                self.apply_removal(outcome)
            }
            None => RemovalStatus::Idle,
        }
    }

    /// Merge a removal result into the current pair if, and only if, it was produced for it.
    ///
    /// Only the pair's cutout is touched; layers and gesture state are left as they are.
    pub fn apply_removal(&mut self, outcome: RemovalOutcome) -> RemovalStatus {
        let Some(pair) = self.image.as_mut().filter(|p| p.id == outcome.pair) else {
            tracing::debug!(pair = %outcome.pair, "discarding removal result for replaced image");
            return RemovalStatus::Discarded(outcome.pair);
        };
        match outcome.result {
            Ok(cutout) => {
                tracing::info!(
                    pair = %pair.id,
                    width = cutout.width,
                    height = cutout.height,
                    "cutout applied"
                );
                pair.cutout = Some(cutout);
                RemovalStatus::Applied(pair.id)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(pair = %pair.id, error = %message, "background removal failed");
                self.notices.push(format!(
                    "Background removal failed; text will not appear behind the subject ({message})"
                ));
                RemovalStatus::Failed {
                    pair: pair.id,
                    message,
                }
            }
        }
    }

    /// Compose the current state at the source's native resolution.
    pub fn render(&mut self, preview: Option<PreviewBox>) -> TextBehindResult<FrameRGBA> {
        if self.removal.is_some() {
            tracing::debug!("rendering while background removal is still running");
        }
        let source = self
            .image
            .as_ref()
            .map(|p| ImageSource::from(p.source.clone()));
        let cutout = self
            .image
            .as_ref()
            .and_then(|p| p.cutout.clone())
            .map(ImageSource::from);
        self.compositor
            .compose(&ExportScene {
                source: source.as_ref(),
                cutout: cutout.as_ref(),
                layers: self.layers.layers(),
                preview,
            })
            .inspect_err(|e| tracing::warn!(error = %e, "render failed"))
    }

    /// Render, encode and hand the result to `sink`. Nothing reaches the sink on failure.
    #[tracing::instrument(skip(self, sink))]
    pub fn export(
        &mut self,
        preview: Option<PreviewBox>,
        sink: &mut dyn ExportSink,
    ) -> TextBehindResult<EncodedImage> {
        let frame = self.render(preview)?;
        let encoded = encode_frame(&frame, &self.opts.export)?;
        sink.write(&encoded)?;
        Ok(encoded)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;

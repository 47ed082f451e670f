use crate::foundation::core::{ImageRect, Point, Vec2};
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::geometry::mapper::{NormalizedPos, clamp_percent, from_pointer, pointer_to_percent};
use crate::layers::model::{LayerId, LayerStack};

/// Fraction of the release velocity carried over as momentum.
pub const DEFAULT_DAMPENING: f64 = 0.1;

/// Pointer-drag input, expressed as plain messages so it can be replayed in tests.
///
/// Points are viewport coordinates; they are resolved against the image's rendered bounding box,
/// not the outer container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureCommand {
    DragStarted {
        id: LayerId,
        point: Point,
    },
    DragMoved {
        id: LayerId,
        point: Point,
    },
    DragEnded {
        id: LayerId,
        point: Point,
        /// Release velocity in pixels per time unit.
        velocity: Vec2,
    },
}

impl GestureCommand {
    pub fn layer(&self) -> LayerId {
        match *self {
            Self::DragStarted { id, .. } | Self::DragMoved { id, .. } | Self::DragEnded { id, .. } => {
                id
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        id: LayerId,
    },
}

/// What a command did to the layer collection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureOutcome {
    Started(LayerId),
    Moved { id: LayerId, pos: NormalizedPos },
    /// The command no longer applies, e.g. its layer was removed mid-drag.
    Ignored,
}

/// Final position of a drag: pointer percentage plus damped momentum, clamped per axis.
pub fn drag_end_position(
    point: Point,
    velocity: Vec2,
    image: ImageRect,
    dampening: f64,
) -> NormalizedPos {
    let (px, py) = pointer_to_percent(image.to_local(point), image.size);
    let final_x = clamp_percent(px + velocity.x * dampening);
    let final_y = clamp_percent(py + velocity.y * dampening);
    NormalizedPos::from_percent(final_x, final_y)
}

/// Reducer turning [`GestureCommand`]s into layer position updates.
///
/// The only state kept between commands is which layer is being dragged; momentum is computed
/// from the release event alone.
#[derive(Clone, Debug)]
pub struct GestureHandler {
    state: DragState,
    dampening: f64,
}

impl Default for GestureHandler {
    fn default() -> Self {
        Self::new(DEFAULT_DAMPENING)
    }
}

impl GestureHandler {
    pub fn new(dampening: f64) -> Self {
        Self {
            state: DragState::Idle,
            dampening,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn dampening(&self) -> f64 {
        self.dampening
    }

    /// Forget an in-flight drag of `id` (used when that layer is removed).
    pub fn release(&mut self, id: LayerId) {
        if self.state == (DragState::Dragging { id }) {
            self.state = DragState::Idle;
        }
    }

    /// Apply one command against `layers`, using `image` as the rendered image bounds.
    pub fn apply(
        &mut self,
        layers: &mut LayerStack,
        image: ImageRect,
        cmd: GestureCommand,
    ) -> TextBehindResult<GestureOutcome> {
        if !image.size.is_measurable() {
            return Err(TextBehindError::validation(
                "gesture requires a measurable image bounding box",
            ));
        }

        let id = cmd.layer();
        if !layers.contains(id) {
            tracing::debug!(%id, "gesture for missing layer ignored");
            self.release(id);
            return Ok(GestureOutcome::Ignored);
        }

        match cmd {
            GestureCommand::DragStarted { .. } => {
                if let DragState::Dragging { id: prev } = self.state
                    && prev != id
                {
                    tracing::debug!(%prev, next = %id, "abandoning previous drag");
                }
                self.state = DragState::Dragging { id };
                Ok(GestureOutcome::Started(id))
            }
            GestureCommand::DragMoved { point, .. } => {
                if self.state != (DragState::Dragging { id }) {
                    return Ok(GestureOutcome::Ignored);
                }
                let pos = from_pointer(image.to_local(point), image.size);
                layers.set_position(id, pos.left, pos.top)?;
                Ok(GestureOutcome::Moved { id, pos })
            }
            GestureCommand::DragEnded {
                point, velocity, ..
            } => {
                let pos = drag_end_position(point, velocity, image, self.dampening);
                layers.set_position(id, pos.left, pos.top)?;
                self.release(id);
                tracing::debug!(%id, left = pos.left, top = pos.top, "drag committed");
                Ok(GestureOutcome::Moved { id, pos })
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gesture/handler.rs"]
mod tests;

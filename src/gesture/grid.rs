use crate::geometry::mapper::clamp_percent;
use crate::layers::model::LayerAttr;

/// Grid step (in percent of the image) used for numeric position edits.
pub const DEFAULT_GRID_SIZE: f64 = 5.0;

/// Axis addressed by a numeric position edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionAxis {
    X,
    Y,
}

/// Round `value` to the nearest multiple of `grid_size`.
///
/// A non-positive or non-finite grid disables snapping.
pub fn snap_to_grid(value: f64, grid_size: f64) -> f64 {
    if !grid_size.is_finite() || grid_size <= 0.0 {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Turn a numeric position edit (percent of the image, y down) into a layer update.
///
/// The value is snapped, clamped to `[0, 100]`, then converted to centered space. Live dragging
/// never goes through here.
pub fn position_edit(axis: PositionAxis, percent: f64, grid_size: f64) -> LayerAttr {
    let v = clamp_percent(snap_to_grid(percent, grid_size));
    match axis {
        PositionAxis::X => LayerAttr::Left(v - 50.0),
        PositionAxis::Y => LayerAttr::Top(50.0 - v),
    }
}

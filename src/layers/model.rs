use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::layers::color::Color;

/// Identifier of a text layer, unique within the active collection.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One styled, positioned text element.
///
/// `left`/`top` live in centered normalized space: both span `[-50, 50]` with `(0, 0)` at the
/// image center, `left` growing rightward and `top` growing upward. `font_size` is in output
/// pixels at 1:1 scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub id: LayerId,
    pub text: String,
    pub font_family: String,
    pub font_weight: u16,
    pub font_size: f64,
    pub color: Color,
    /// 0 = invisible, 1 = opaque.
    pub opacity: f64,
    pub shadow_color: Color,
    pub shadow_size: f64,
    pub left: f64,
    pub top: f64,
    /// Degrees, clockwise positive, about the layer's own center.
    pub rotation: f64,
}

impl TextLayer {
    /// Build a layer at the image center using `defaults` for everything else.
    pub fn with_defaults(id: LayerId, defaults: &LayerDefaults) -> Self {
        Self {
            id,
            text: defaults.text.clone(),
            font_family: defaults.font_family.clone(),
            font_weight: defaults.font_weight,
            font_size: defaults.font_size,
            color: defaults.color,
            opacity: defaults.opacity,
            shadow_color: defaults.shadow_color,
            shadow_size: defaults.shadow_size,
            left: 0.0,
            top: 0.0,
            rotation: defaults.rotation,
        }
    }

    /// Overwrite exactly one attribute.
    pub fn apply(&mut self, attr: LayerAttr) {
        match attr {
            LayerAttr::Text(v) => self.text = v,
            LayerAttr::FontFamily(v) => self.font_family = v,
            LayerAttr::FontWeight(v) => self.font_weight = v,
            LayerAttr::FontSize(v) => self.font_size = v,
            LayerAttr::Color(v) => self.color = v,
            LayerAttr::Opacity(v) => self.opacity = v,
            LayerAttr::ShadowColor(v) => self.shadow_color = v,
            LayerAttr::ShadowSize(v) => self.shadow_size = v,
            LayerAttr::Left(v) => self.left = v,
            LayerAttr::Top(v) => self.top = v,
            LayerAttr::Rotation(v) => self.rotation = v,
        }
    }
}

/// Style applied to freshly added layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerDefaults {
    pub text: String,
    pub font_family: String,
    pub font_weight: u16,
    pub font_size: f64,
    pub color: Color,
    pub opacity: f64,
    pub shadow_color: Color,
    pub shadow_size: f64,
    pub rotation: f64,
}

impl Default for LayerDefaults {
    fn default() -> Self {
        Self {
            text: "edit".to_owned(),
            font_family: "Inter".to_owned(),
            font_weight: 800,
            font_size: 200.0,
            color: Color::WHITE,
            opacity: 1.0,
            shadow_color: Color::rgba(0, 0, 0, 204),
            shadow_size: 4.0,
            rotation: 0.0,
        }
    }
}

/// A single-attribute update, the only way the UI mutates a layer.
///
/// Range validation (slider bounds and the like) is the caller's job.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerAttr {
    Text(String),
    FontFamily(String),
    FontWeight(u16),
    FontSize(f64),
    Color(Color),
    Opacity(f64),
    ShadowColor(Color),
    ShadowSize(f64),
    Left(f64),
    Top(f64),
    Rotation(f64),
}

impl LayerAttr {
    /// Attribute name as used by the editor UI.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::FontFamily(_) => "fontFamily",
            Self::FontWeight(_) => "fontWeight",
            Self::FontSize(_) => "fontSize",
            Self::Color(_) => "color",
            Self::Opacity(_) => "opacity",
            Self::ShadowColor(_) => "shadowColor",
            Self::ShadowSize(_) => "shadowSize",
            Self::Left(_) => "left",
            Self::Top(_) => "top",
            Self::Rotation(_) => "rotation",
        }
    }

    /// Decode an `(attribute, value)` pair coming from UI glue.
    ///
    /// Names are matched case-insensitively and may be camelCase or snake_case.
    pub fn from_json(name: &str, value: serde_json::Value) -> TextBehindResult<Self> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let number = |v: &serde_json::Value| -> TextBehindResult<f64> {
            let n = match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match n {
                Some(n) if n.is_finite() => Ok(n),
                _ => Err(TextBehindError::validation(format!(
                    "attribute \"{name}\" expects a finite number, got {v}"
                ))),
            }
        };
        let string = |v: serde_json::Value| -> TextBehindResult<String> {
            match v {
                serde_json::Value::String(s) => Ok(s),
                other => Err(TextBehindError::validation(format!(
                    "attribute \"{name}\" expects a string, got {other}"
                ))),
            }
        };
        let color = |v: serde_json::Value| -> TextBehindResult<Color> {
            serde_json::from_value(v).map_err(|e| {
                TextBehindError::validation(format!("attribute \"{name}\" expects a color: {e}"))
            })
        };

        let attr = match key.as_str() {
            "text" => Self::Text(string(value)?),
            "fontfamily" => Self::FontFamily(string(value)?),
            "fontweight" => {
                let w = number(&value)?;
                if !(1.0..=1000.0).contains(&w) {
                    return Err(TextBehindError::validation(format!(
                        "fontWeight must be within 1..=1000, got {w}"
                    )));
                }
                Self::FontWeight(w.round() as u16)
            }
            "fontsize" => Self::FontSize(number(&value)?),
            "color" => Self::Color(color(value)?),
            "opacity" => Self::Opacity(number(&value)?),
            "shadowcolor" => Self::ShadowColor(color(value)?),
            "shadowsize" => Self::ShadowSize(number(&value)?),
            "left" => Self::Left(number(&value)?),
            "top" => Self::Top(number(&value)?),
            "rotation" => Self::Rotation(number(&value)?),
            _ => {
                return Err(TextBehindError::validation(format!(
                    "unknown layer attribute \"{name}\""
                )));
            }
        };
        Ok(attr)
    }
}

/// Ordered collection of text layers; later layers draw on top of earlier ones.
///
/// New ids come from a counter that never goes below `max(existing ids) + 1`, so the first id in
/// an empty stack is `1` and ids freed by removal are not handed out again. Removing the highest
/// id therefore does not make it available: with ids `[1, 2, 3]`, removing `3` and adding yields
/// `4`. Ids stay valid as external references for the life of the stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TextLayer>", into = "Vec<TextLayer>")]
pub struct LayerStack {
    layers: Vec<TextLayer>,
    next_id: u32,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing collection, rejecting duplicate ids.
    pub fn from_layers(layers: Vec<TextLayer>) -> TextBehindResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(layers.len());
        for l in &layers {
            if !seen.insert(l.id) {
                return Err(TextBehindError::validation(format!(
                    "duplicate layer id {}",
                    l.id
                )));
            }
        }
        let next_id = layers
            .iter()
            .map(|l| l.id.0)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Ok(Self { layers, next_id })
    }

    /// Layers in draw order.
    pub fn layers(&self) -> &[TextLayer] {
        &self.layers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&TextLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    /// Append a new layer built from `defaults` and return its id.
    pub fn add_layer(&mut self, defaults: &LayerDefaults) -> LayerId {
        let id = self.allocate_id();
        self.layers.push(TextLayer::with_defaults(id, defaults));
        tracing::debug!(%id, "layer added");
        id
    }

    /// Replace one attribute of one layer, leaving everything else untouched.
    pub fn update_attribute(&mut self, id: LayerId, attr: LayerAttr) -> TextBehindResult<()> {
        let layer = self.get_mut(id)?;
        tracing::trace!(%id, attr = attr.name(), "layer attribute updated");
        layer.apply(attr);
        Ok(())
    }

    /// Append a copy of layer `id` under a fresh id and return that id.
    pub fn duplicate_layer(&mut self, id: LayerId) -> TextBehindResult<LayerId> {
        let mut copy = self
            .get(id)
            .cloned()
            .ok_or(TextBehindError::LayerNotFound(id))?;
        let new_id = self.allocate_id();
        copy.id = new_id;
        self.layers.push(copy);
        tracing::debug!(from = %id, to = %new_id, "layer duplicated");
        Ok(new_id)
    }

    /// Remove layer `id` and return it.
    pub fn remove_layer(&mut self, id: LayerId) -> TextBehindResult<TextLayer> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(TextBehindError::LayerNotFound(id))?;
        tracing::debug!(%id, "layer removed");
        Ok(self.layers.remove(idx))
    }

    /// Move a layer to a centered-space position.
    pub fn set_position(&mut self, id: LayerId, left: f64, top: f64) -> TextBehindResult<()> {
        let layer = self.get_mut(id)?;
        layer.left = left;
        layer.top = top;
        Ok(())
    }

    fn get_mut(&mut self, id: LayerId) -> TextBehindResult<&mut TextLayer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(TextBehindError::LayerNotFound(id))
    }

    fn allocate_id(&mut self) -> LayerId {
        let max_present = self.layers.iter().map(|l| l.id.0).max().unwrap_or(0);
        let id = self.next_id.max(max_present.saturating_add(1)).max(1);
        self.next_id = id.saturating_add(1);
        LayerId(id)
    }
}

impl TryFrom<Vec<TextLayer>> for LayerStack {
    type Error = TextBehindError;

    fn try_from(layers: Vec<TextLayer>) -> Result<Self, Self::Error> {
        Self::from_layers(layers)
    }
}

impl From<LayerStack> for Vec<TextLayer> {
    fn from(stack: LayerStack) -> Self {
        stack.layers
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a TextLayer;
    type IntoIter = std::slice::Iter<'a, TextLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/model.rs"]
mod tests;

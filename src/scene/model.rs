use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::core::PreviewBox;
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::layers::model::{LayerAttr, LayerId};
use crate::session::editor::{EditorOpts, EditorSession};

/// JSON description of one render: the source image, an optional precomputed cutout, the
/// preview box the layers were positioned against and the layers themselves.
///
/// Each layer is a map of attribute name to value, using the same names and value forms as
/// [`LayerAttr::from_json`]. Attributes a layer leaves out take the editor defaults; an `id`
/// key is accepted and ignored, ids are assigned in order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SceneDef {
    pub source: PathBuf,
    #[serde(default)]
    pub cutout: Option<PathBuf>,
    pub preview: PreviewBox,
    #[serde(default)]
    pub fonts: Vec<PathBuf>,
    #[serde(default)]
    pub editor: EditorOpts,
    #[serde(default)]
    pub layers: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl SceneDef {
    pub fn from_reader<R: std::io::Read>(r: R) -> TextBehindResult<Self> {
        let def: SceneDef = serde_json::from_reader(r)
            .map_err(|e| TextBehindError::serde(format!("parse scene JSON: {e}")))?;
        def.validate()?;
        Ok(def)
    }

    /// Parse a scene file; relative image and font paths are resolved against its directory.
    pub fn from_path(path: impl AsRef<Path>) -> TextBehindResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TextBehindError::validation(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        let mut def = Self::from_reader(BufReader::new(f))?;
        if let Some(base) = path.parent() {
            def.resolve_paths(base);
        }
        Ok(def)
    }

    pub fn validate(&self) -> TextBehindResult<()> {
        self.preview.measured()?;
        for (i, layer) in self.layers.iter().enumerate() {
            for (name, value) in layer {
                if name == "id" {
                    continue;
                }
                LayerAttr::from_json(name, value.clone()).map_err(|e| {
                    TextBehindError::validation(format!("layer {i}: {e}"))
                })?;
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.source);
        if let Some(c) = self.cutout.as_mut() {
            resolve(c);
        }
        self.fonts.iter_mut().for_each(resolve);
    }

    /// Add this scene's layers to `session`, in order, through the regular layer operations.
    pub fn apply_layers(&self, session: &mut EditorSession) -> TextBehindResult<Vec<LayerId>> {
        let mut ids = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let id = session.add_layer();
            for (name, value) in layer {
                if name == "id" {
                    continue;
                }
                session.update_attribute_json(id, name, value.clone())?;
            }
            ids.push(id);
        }
        tracing::debug!(layers = ids.len(), "scene layers applied");
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::export::encode::EncodedImage;
use crate::foundation::error::TextBehindResult;

/// Consumer of finished exports.
///
/// A sink only ever sees fully encoded images; failed exports never reach it.
pub trait ExportSink: Send {
    fn write(&mut self, image: &EncodedImage) -> TextBehindResult<()>;
}

/// Writes exports to disk.
///
/// Files are written to a temporary sibling first and renamed into place, so a reader never
/// observes a half-written image.
#[derive(Clone, Debug)]
pub struct FileSink {
    target: FileTarget,
    last_written: Option<PathBuf>,
}

#[derive(Clone, Debug)]
enum FileTarget {
    /// Use the suggested file name inside this directory.
    Dir(PathBuf),
    /// Always write to this exact path.
    Path(PathBuf),
}

impl FileSink {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            target: FileTarget::Dir(dir.into()),
            last_written: None,
        }
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            target: FileTarget::Path(path.into()),
            last_written: None,
        }
    }

    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }

    fn resolve(&self, image: &EncodedImage) -> PathBuf {
        match &self.target {
            FileTarget::Dir(dir) => dir.join(&image.file_name),
            FileTarget::Path(p) => p.clone(),
        }
    }
}

impl ExportSink for FileSink {
    fn write(&mut self, image: &EncodedImage) -> TextBehindResult<()> {
        let path = self.resolve(image);
        ensure_parent_dir(&path)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.file_name.clone());
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));
        std::fs::write(&tmp, &image.bytes)
            .with_context(|| format!("failed to write '{}'", tmp.display()))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(anyhow::Error::new(e)
                .context(format!("failed to move export into '{}'", path.display()))
                .into());
        }

        tracing::info!(path = %path.display(), bytes = image.bytes.len(), "export written");
        self.last_written = Some(path);
        Ok(())
    }
}

/// Keeps exports in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub(crate) images: Vec<EncodedImage>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }
}

impl ExportSink for InMemorySink {
    fn write(&mut self, image: &EncodedImage) -> TextBehindResult<()> {
        self.images.push(image.clone());
        Ok(())
    }
}

pub fn ensure_parent_dir(path: &Path) -> TextBehindResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;

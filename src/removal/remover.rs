use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::assets::decode::{PreparedImage, load_image_file};
use crate::foundation::error::{TextBehindError, TextBehindResult};

/// Background-removal collaborator: given the source image, produce the subject cutout.
///
/// Implementations run on a worker thread and may block for as long as they need; there is no
/// timeout or cancellation.
pub trait BackgroundRemover: Send + Sync {
    fn remove_background(&self, source: &PreparedImage) -> TextBehindResult<PreparedImage>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "remover"
    }
}

impl<F> BackgroundRemover for F
where
    F: Fn(&PreparedImage) -> TextBehindResult<PreparedImage> + Send + Sync,
{
    fn remove_background(&self, source: &PreparedImage) -> TextBehindResult<PreparedImage> {
        self(source)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// A cutout that was computed ahead of time and stored on disk.
#[derive(Clone, Debug)]
pub struct FileCutout {
    path: PathBuf,
}

impl FileCutout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BackgroundRemover for FileCutout {
    fn remove_background(&self, _source: &PreparedImage) -> TextBehindResult<PreparedImage> {
        load_image_file(&self.path)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Runs an external program that reads the source image and writes a cutout PNG.
///
/// `{input}` and `{output}` in the arguments are replaced with temporary file paths. When neither
/// placeholder is used the two paths are appended, input first.
#[derive(Clone, Debug)]
pub struct CommandRemover {
    program: String,
    args: Vec<String>,
    work_dir: PathBuf,
}

impl CommandRemover {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            work_dir: std::env::temp_dir(),
        }
    }

    /// Directory for the temporary input/output files.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    fn command_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let uses_placeholders = self
            .args
            .iter()
            .any(|a| a.contains("{input}") || a.contains("{output}"));
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect();
        if !uses_placeholders {
            args.push(input.into_owned());
            args.push(output.into_owned());
        }
        args
    }

    fn run(&self, input: &Path, output: &Path) -> TextBehindResult<()> {
        let out = Command::new(&self.program)
            .args(self.command_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                TextBehindError::removal_failed(format!(
                    "failed to spawn '{}': {e}",
                    self.program
                ))
            })?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(TextBehindError::removal_failed(format!(
                "'{}' exited with {}: {}",
                self.program,
                out.status,
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(TextBehindError::removal_failed(format!(
                "'{}' did not write a cutout",
                self.program
            )));
        }
        Ok(())
    }
}

impl BackgroundRemover for CommandRemover {
    fn remove_background(&self, source: &PreparedImage) -> TextBehindResult<PreparedImage> {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let stem = format!("textbehind-{}-{n}", std::process::id());
        let input = self.work_dir.join(format!("{stem}-in.png"));
        let output = self.work_dir.join(format!("{stem}-out.png"));

        let result = image::save_buffer_with_format(
            &input,
            &source.to_straight_rgba8(),
            source.width,
            source.height,
            image::ExtendedColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| TextBehindError::removal_failed(format!("write removal input: {e}")))
        .and_then(|()| self.run(&input, &output))
        .and_then(|()| load_image_file(&output));

        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&output);
        result
    }

    fn name(&self) -> &str {
        &self.program
    }
}

pub fn is_program_on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/removal/remover.rs"]
mod tests;

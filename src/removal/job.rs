use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

use crate::assets::decode::PreparedImage;
use crate::foundation::error::{TextBehindError, TextBehindResult};
use crate::removal::remover::BackgroundRemover;

/// Identity of one loaded source image and the cutout derived from it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ImagePairId(pub u64);

impl std::fmt::Display for ImagePairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a finished removal, tagged with the pair it was started for.
#[derive(Debug)]
pub struct RemovalOutcome {
    pub pair: ImagePairId,
    pub result: TextBehindResult<PreparedImage>,
}

/// A background removal running on its own worker thread.
///
/// Dropping the job detaches the worker; it runs to completion and its result is discarded.
#[derive(Debug)]
pub struct RemovalJob {
    pair: ImagePairId,
    rx: Receiver<TextBehindResult<PreparedImage>>,
    handle: Option<JoinHandle<()>>,
}

impl RemovalJob {
    #[tracing::instrument(skip(source, remover), fields(remover = remover.name()))]
    pub fn spawn(
        pair: ImagePairId,
        source: PreparedImage,
        remover: Arc<dyn BackgroundRemover>,
    ) -> TextBehindResult<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name(format!("textbehind-removal-{}", pair.0))
            .spawn(move || {
                let result = remover.remove_background(&source);
                if let Err(e) = &result {
                    tracing::debug!(%pair, error = %e, "removal worker finished with error");
                }
                // The session may have moved on; a closed channel is fine.
                let _ = tx.send(result);
            })
            .map_err(|e| {
                TextBehindError::removal_failed(format!("failed to start removal worker: {e}"))
            })?;
        tracing::debug!(%pair, "removal started");
        Ok(Self {
            pair,
            rx,
            handle: Some(handle),
        })
    }

    pub fn pair(&self) -> ImagePairId {
        self.pair
    }

    /// Non-blocking poll. `None` while the worker is still running.
    pub fn try_take(&mut self) -> Option<RemovalOutcome> {
        let result = match self.rx.try_recv() {
            Ok(r) => r,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(worker_lost()),
        };
        self.join();
        Some(RemovalOutcome {
            pair: self.pair,
            result,
        })
    }

    /// Block until the worker finishes.
    pub fn wait(mut self) -> RemovalOutcome {
        let result = self.rx.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.join();
        RemovalOutcome {
            pair: self.pair,
            result,
        }
    }

    fn join(&mut self) {
        if let Some(h) = self.handle.take()
            && h.join().is_err()
        {
            tracing::warn!(pair = %self.pair, "removal worker panicked");
        }
    }
}

fn worker_lost() -> TextBehindError {
    TextBehindError::removal_failed("removal worker exited without a result")
}

#[cfg(test)]
#[path = "../../tests/unit/removal/job.rs"]
mod tests;

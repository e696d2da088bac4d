//! Per-run working directory.
//!
//! A [`WorkingScope`] owns the transient directory that holds every
//! intermediate artifact of one pipeline run (rendered slide images,
//! synthesized narration). The directory exists from [`WorkingScope::open`]
//! until [`WorkingScope::close`]; if the scope is dropped without being
//! closed (early return, panic unwinding) the same removal runs from `Drop`.
//!
//! Scopes are never shared between runs. Opening a directory that already
//! holds files is refused, since closing would delete them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{SlidecastError, SlidecastResult};

const PROBE_FILE: &str = ".slidecast-probe";

/// The transient working directory of a single pipeline run.
#[derive(Debug)]
pub struct WorkingScope {
    root: PathBuf,
    released: bool,
}

impl WorkingScope {
    /// Create (or adopt an empty) working directory at `path`.
    pub fn open(path: impl AsRef<Path>) -> SlidecastResult<Self> {
        let path = path.as_ref();
        let created = match std::fs::metadata(path) {
            Ok(meta) if !meta.is_dir() => {
                return Err(SlidecastError::scope(path, "exists and is not a directory"));
            }
            Ok(_) => {
                let mut entries = std::fs::read_dir(path)
                    .map_err(|e| SlidecastError::scope(path, format!("cannot list: {e}")))?;
                if entries.next().is_some() {
                    return Err(SlidecastError::scope(
                        path,
                        "directory is not empty; refusing to reuse it as a working scope",
                    ));
                }
                false
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                std::fs::create_dir_all(path)
                    .map_err(|e| SlidecastError::scope(path, format!("cannot create: {e}")))?;
                true
            }
            Err(e) => return Err(SlidecastError::scope(path, format!("cannot inspect: {e}"))),
        };

        let root = std::fs::canonicalize(path)
            .map_err(|e| SlidecastError::scope(path, format!("cannot resolve: {e}")))?;

        let probe = root.join(PROBE_FILE);
        if let Err(e) = std::fs::write(&probe, b"").and_then(|_| std::fs::remove_file(&probe)) {
            if created {
                std::fs::remove_dir_all(&root).ok();
            }
            return Err(SlidecastError::scope(path, format!("not writable: {e}")));
        }

        tracing::debug!(path = %root.display(), created, "Working scope opened");
        Ok(Self {
            root,
            released: false,
        })
    }

    /// Absolute path of the working directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Where the rendered image of slide `index` lives.
    pub fn slide_image_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("slide_{index}.png"))
    }

    /// Where the narration audio of slide `index` lives.
    pub fn slide_audio_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("slide_{index}.mp3"))
    }

    /// Path for any other per-run artifact.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Delete everything in the scope and remove the directory.
    ///
    /// Files that are already gone are ignored, as is a directory that has
    /// already been removed. Fails only if the directory itself survives.
    pub fn close(mut self) -> SlidecastResult<()> {
        self.release()
    }

    fn release(&mut self) -> SlidecastResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(SlidecastError::scope(
                    &self.root,
                    format!("cannot list for cleanup: {e}"),
                ))
            }
        };

        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                }
            }
        }

        match std::fs::remove_dir(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SlidecastError::scope(
                    &self.root,
                    format!("cannot remove working directory: {e}"),
                ))
            }
        }

        tracing::debug!(path = %self.root.display(), removed, "Working scope closed");
        Ok(())
    }
}

impl Drop for WorkingScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(path = %self.root.display(), "Working scope dropped without close");
        if let Err(e) = self.release() {
            tracing::error!(error = %e, "Working scope cleanup failed");
        }
    }
}

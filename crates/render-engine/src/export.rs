//! Export configuration and the video assembly driver.

use std::path::{Path, PathBuf};

use slidecast_common::config::EncodeDefaults;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_deck_model::Timeline;

use crate::ffmpeg::FfmpegBackend;

/// Encoder parameters for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    /// Output frame rate.
    pub fps: u32,

    /// Video codec passed to the encoder (e.g. `libx264`).
    pub video_codec: String,

    /// Audio codec passed to the encoder (e.g. `aac`).
    pub audio_codec: String,

    /// Output frame width in pixels.
    pub width: u32,

    /// Output frame height in pixels.
    pub height: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&EncodeDefaults::default())
    }
}

impl From<&EncodeDefaults> for EncodeSettings {
    fn from(defaults: &EncodeDefaults) -> Self {
        Self {
            fps: defaults.fps,
            video_codec: defaults.video_codec.clone(),
            audio_codec: defaults.audio_codec.clone(),
            width: defaults.width,
            height: defaults.height,
        }
    }
}

impl EncodeSettings {
    fn validate(&self) -> SlidecastResult<()> {
        if self.fps == 0 {
            return Err(SlidecastError::encode("frame rate must be at least 1"));
        }
        // yuv420p needs even dimensions.
        if self.width < 2 || self.height < 2 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(SlidecastError::encode(format!(
                "output size {}x{} must be even and non-zero",
                self.width, self.height
            )));
        }
        if self.video_codec.trim().is_empty() || self.audio_codec.trim().is_empty() {
            return Err(SlidecastError::encode("codec names must not be empty"));
        }
        Ok(())
    }
}

/// A render job handed to a backend.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Segments to encode, in order.
    pub timeline: Timeline,

    /// File the backend writes. The driver moves it into place afterwards.
    pub output_path: PathBuf,

    /// Encoder parameters.
    pub settings: EncodeSettings,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// How far the encoder has got, in seconds of finished video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportProgress {
    pub stage: ExportStage,
    pub encoded_secs: f64,
    pub total_secs: f64,
}

impl ExportProgress {
    /// Completed share of the video in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        match self.stage {
            ExportStage::Preparing => 0.0,
            ExportStage::Complete => 1.0,
            ExportStage::Encoding if self.total_secs > 0.0 => {
                (self.encoded_secs / self.total_secs).clamp(0.0, 1.0)
            }
            ExportStage::Encoding => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Encoding,
    Complete,
}

/// Trait for render backends.
pub trait RenderBackend: Send {
    /// Encode `job.timeline` into `job.output_path`.
    fn render(&mut self, job: &ExportJob, progress: Option<ProgressCallback>) -> SlidecastResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Turns a [`Timeline`] into the final video file.
pub struct VideoAssemblyDriver {
    backend: Box<dyn RenderBackend>,
}

impl Default for VideoAssemblyDriver {
    fn default() -> Self {
        Self::new(Box::new(FfmpegBackend::default()))
    }
}

impl VideoAssemblyDriver {
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Render `timeline` to `output_path`.
    ///
    /// The backend writes a hidden partial file next to the output, which is
    /// renamed into place only when encoding succeeds. On failure the partial
    /// file is removed and any existing file at `output_path` is untouched.
    pub fn render(
        &mut self,
        timeline: &Timeline,
        output_path: &Path,
        settings: &EncodeSettings,
        progress: Option<ProgressCallback>,
    ) -> SlidecastResult<PathBuf> {
        validate_timeline(timeline)?;
        settings.validate()?;
        if output_path.is_dir() {
            return Err(SlidecastError::encode(format!(
                "output path is a directory: {}",
                output_path.display()
            )));
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        if let Some(cb) = &progress {
            cb(ExportProgress {
                stage: ExportStage::Preparing,
                encoded_secs: 0.0,
                total_secs: timeline.total_duration_secs(),
            });
        }

        let partial_path = partial_path_for(output_path);
        let job = ExportJob {
            timeline: timeline.clone(),
            output_path: partial_path.clone(),
            settings: settings.clone(),
        };

        tracing::info!(
            backend = self.backend.name(),
            output = %output_path.display(),
            segments = timeline.len(),
            duration_secs = timeline.total_duration_secs(),
            "Starting export"
        );

        if let Err(e) = self.backend.render(&job, progress) {
            discard_partial(&partial_path);
            return Err(e);
        }

        if !partial_path.is_file() {
            return Err(SlidecastError::encode(format!(
                "{} reported success but wrote no output",
                self.backend.name()
            )));
        }

        if let Err(e) = std::fs::rename(&partial_path, output_path) {
            discard_partial(&partial_path);
            return Err(SlidecastError::encode(format!(
                "failed to move finished video to {}: {e}",
                output_path.display()
            )));
        }

        tracing::info!(output = %output_path.display(), "Export finished");
        Ok(output_path.to_path_buf())
    }
}

/// Reject timelines no encoder could turn into a valid video.
pub fn validate_timeline(timeline: &Timeline) -> SlidecastResult<()> {
    if timeline.is_empty() {
        return Err(SlidecastError::encode("timeline has no entries"));
    }

    for (position, entry) in timeline.iter().enumerate() {
        if !entry.duration_secs.is_finite() || entry.duration_secs <= 0.0 {
            return Err(SlidecastError::encode(format!(
                "entry {position} (slide {}) has non-positive duration {}s",
                entry.slide_index, entry.duration_secs
            )));
        }
        if !entry.image_path.is_file() {
            return Err(SlidecastError::encode(format!(
                "entry {position}: slide image missing: {}",
                entry.image_path.display()
            )));
        }
        if let Some(audio) = &entry.audio_path {
            if !audio.is_file() {
                return Err(SlidecastError::encode(format!(
                    "entry {position}: narration audio missing: {}",
                    audio.display()
                )));
            }
        }
    }

    Ok(())
}

/// `dir/.name.partial.ext`, keeping the extension so the encoder still
/// picks the right container.
fn partial_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output_path.extension() {
        Some(ext) => format!(".{stem}.partial.{}", ext.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };
    output_path.with_file_name(name)
}

fn discard_partial(partial_path: &Path) {
    match std::fs::remove_file(partial_path) {
        Ok(()) => tracing::debug!(path = %partial_path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %partial_path.display(),
            error = %e,
            "Failed to remove partial output"
        ),
    }
}

//! The run driver.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slidecast_common::config::AppConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::WorkingScope;
use slidecast_deck_model::Timeline;
use slidecast_deck_reader::ContentExtractor;
use slidecast_narration::{cues_for_timeline, save_subtitles, NarrationGenerator};
use slidecast_render_engine::{EncodeSettings, ProgressCallback, VideoAssemblyDriver};

/// Per-run settings that are not owned by a stage.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Working directory for intermediate artifacts. Must be absent or empty.
    pub work_dir: PathBuf,

    /// Encoder parameters.
    pub encode: EncodeSettings,

    /// Write the assembled timeline here as JSON.
    pub dump_timeline: Option<PathBuf>,

    /// Write a subtitle sidecar here (`.vtt` for WebVTT, else SRT).
    pub subtitles: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            encode: EncodeSettings::from(&config.encode),
            dump_timeline: None,
            subtitles: None,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Slides in the deck.
    pub slides: usize,

    /// Slides with a narration track.
    pub narrated: usize,

    /// Length of the rendered video.
    pub total_duration_secs: f64,

    /// The rendered video.
    pub output: PathBuf,

    /// Subtitle sidecar, if one was written.
    pub subtitles: Option<PathBuf>,

    /// Set when the video was written but the working directory could
    /// not be fully removed.
    pub cleanup_error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub elapsed_secs: f64,
}

/// What the scoped part of a run hands back for the summary.
struct StageOutput {
    timeline: Timeline,
    output: PathBuf,
    subtitles: Option<PathBuf>,
}

/// One configured deck-to-video converter.
pub struct Pipeline {
    extractor: ContentExtractor,
    narrator: NarrationGenerator,
    driver: VideoAssemblyDriver,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        extractor: ContentExtractor,
        narrator: NarrationGenerator,
        driver: VideoAssemblyDriver,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            narrator,
            driver,
            options,
        }
    }

    /// Default backends (LibreOffice, edge-tts, ffmpeg) configured from `config`.
    pub fn from_config(config: &AppConfig) -> SlidecastResult<Self> {
        config.validate()?;
        let narrator = NarrationGenerator::with_edge_tts(
            config.narration.voice.clone(),
            f64::from(config.narration.fallback_duration_secs),
        )?
        .with_jobs(config.narration.jobs);

        Ok(Self::new(
            ContentExtractor::with_defaults(),
            narrator,
            VideoAssemblyDriver::default(),
            PipelineOptions::from(config),
        ))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut PipelineOptions {
        &mut self.options
    }

    /// Every external backend the run needs, with its availability.
    pub fn backend_report(&self) -> Vec<(String, bool)> {
        let renderer = self.extractor.renderer();
        let synthesizer = self.narrator.synthesizer();
        let encoder = self.driver.backend();
        vec![
            (renderer.name().to_string(), renderer.is_available()),
            (synthesizer.name().to_string(), synthesizer.is_available()),
            (encoder.name().to_string(), encoder.is_available()),
        ]
    }

    /// Fail with `Unsupported` if any backend is missing.
    pub fn preflight(&self) -> SlidecastResult<()> {
        let missing: Vec<String> = self
            .backend_report()
            .into_iter()
            .filter(|(_, available)| !available)
            .map(|(name, _)| name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SlidecastError::unsupported(format!(
                "required tools not found: {}",
                missing.join(", ")
            )))
        }
    }

    /// Convert `deck_path` into a narrated video at `output_path`.
    ///
    /// The working directory is created here and removed before returning,
    /// whatever the outcome. If a stage fails its error is returned, and a
    /// cleanup problem is only logged. If every stage succeeds, a cleanup
    /// problem is reported in [`RunSummary::cleanup_error`].
    pub async fn run(
        &mut self,
        deck_path: &Path,
        output_path: &Path,
        progress: Option<ProgressCallback>,
    ) -> SlidecastResult<RunSummary> {
        let started_at = Utc::now();
        let started = Instant::now();

        self.preflight()?;

        let scope = WorkingScope::open(&self.options.work_dir)?;
        if let Err(e) = check_output_outside(scope.path(), output_path) {
            if let Err(close_err) = scope.close() {
                tracing::warn!(error = %close_err, "Working directory cleanup failed");
            }
            return Err(e);
        }
        tracing::info!(
            deck = %deck_path.display(),
            work_dir = %scope.path().display(),
            "Run started"
        );

        let staged = self.run_stages(deck_path, output_path, &scope, progress).await;
        let (stage_output, cleanup_error) = settle(staged, scope.close())?;

        let summary = RunSummary {
            slides: stage_output.timeline.len(),
            narrated: stage_output.timeline.narrated_count(),
            total_duration_secs: stage_output.timeline.total_duration_secs(),
            output: stage_output.output,
            subtitles: stage_output.subtitles,
            cleanup_error,
            started_at,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            slides = summary.slides,
            narrated = summary.narrated,
            duration_secs = summary.total_duration_secs,
            output = %summary.output.display(),
            elapsed_secs = summary.elapsed_secs,
            "Run finished"
        );
        Ok(summary)
    }

    async fn run_stages(
        &mut self,
        deck_path: &Path,
        output_path: &Path,
        scope: &WorkingScope,
        progress: Option<ProgressCallback>,
    ) -> SlidecastResult<StageOutput> {
        let stage_start = Instant::now();
        let slides = self.extractor.extract(deck_path, scope)?;
        tracing::info!(
            slides = slides.len(),
            elapsed_ms = stage_start.elapsed().as_millis(),
            "Extract stage done"
        );

        let stage_start = Instant::now();
        let narrations = self.narrator.narrate_all(&slides, scope).await?;
        tracing::info!(
            narrated = narrations.iter().filter(|n| n.has_audio()).count(),
            elapsed_ms = stage_start.elapsed().as_millis(),
            "Narrate stage done"
        );

        let timeline = slidecast_assembler::assemble(&slides, &narrations)?;

        if let Some(path) = &self.options.dump_timeline {
            ensure_parent(path)?;
            timeline.save(path)?;
            tracing::info!(path = %path.display(), "Timeline written");
        }

        let stage_start = Instant::now();
        let output = self
            .driver
            .render(&timeline, output_path, &self.options.encode, progress)?;
        tracing::info!(
            output = %output.display(),
            elapsed_ms = stage_start.elapsed().as_millis(),
            "Render stage done"
        );

        let subtitles = match &self.options.subtitles {
            Some(path) => {
                ensure_parent(path)?;
                save_subtitles(&cues_for_timeline(&slides, &timeline), path)?;
                tracing::info!(path = %path.display(), "Subtitles written");
                Some(path.clone())
            }
            None => None,
        };

        Ok(StageOutput {
            timeline,
            output,
            subtitles,
        })
    }
}

/// Combine the stage result with the scope close result.
///
/// A stage error always wins; a close failure next to it is only logged.
/// After successful stages a close failure is handed back as a message.
fn settle<T>(
    staged: SlidecastResult<T>,
    closed: SlidecastResult<()>,
) -> SlidecastResult<(T, Option<String>)> {
    match (staged, closed) {
        (Ok(staged), Ok(())) => Ok((staged, None)),
        (Ok(staged), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Video written but working directory cleanup failed");
            Ok((staged, Some(close_err.to_string())))
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::error!(
                stage = e.stage(),
                error = %close_err,
                "Working directory cleanup failed after a failed run"
            );
            Err(e)
        }
    }
}

/// The working directory is deleted at the end of the run, so the video
/// must not land inside it. `work_dir` is already canonical.
fn check_output_outside(work_dir: &Path, output_path: &Path) -> SlidecastResult<()> {
    let output = resolve(output_path)?;
    if output.starts_with(work_dir) {
        return Err(SlidecastError::config(format!(
            "output {} resolves to {}, inside the working directory {}, which is removed after every run",
            output_path.display(),
            output.display(),
            work_dir.display()
        )));
    }
    Ok(())
}

/// Resolve `path` the way the filesystem will: symlinks in the existing
/// part are followed and `..` is applied after them. Components that do
/// not exist yet are taken as written.
fn resolve(path: &Path) -> SlidecastResult<PathBuf> {
    let mut resolved = PathBuf::new();
    for component in absolute(path)?.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                if let Ok(real) = std::fs::canonicalize(&resolved) {
                    resolved = real;
                }
            }
        }
    }
    Ok(resolved)
}

fn absolute(path: &Path) -> SlidecastResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn ensure_parent(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

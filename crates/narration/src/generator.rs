//! Per-slide narration.
//!
//! Slides without notes get a silent unit with the fallback duration and
//! never reach the synthesizer. Slides with notes are synthesized into the
//! working scope and take the measured length of the audio.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::WorkingScope;
use slidecast_deck_model::{estimate_speaking_secs, NarrationUnit, SlideContent};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::synthesizer::{validate_voice, EdgeTtsSynthesizer, SpeechSynthesizer};

/// Produces one [`NarrationUnit`] per slide.
pub struct NarrationGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voice: String,
    fallback_duration_secs: f64,
    jobs: usize,
}

impl NarrationGenerator {
    /// Fails if `voice` cannot name a voice or the fallback is negative.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voice: impl Into<String>,
        fallback_duration_secs: f64,
    ) -> SlidecastResult<Self> {
        let voice = voice.into();
        validate_voice(&voice)?;
        if !fallback_duration_secs.is_finite() || fallback_duration_secs < 0.0 {
            return Err(SlidecastError::config(format!(
                "fallback duration must be a non-negative number of seconds, got {fallback_duration_secs}"
            )));
        }
        Ok(Self {
            synthesizer,
            voice,
            fallback_duration_secs,
            jobs: 1,
        })
    }

    /// edge-tts with the given voice.
    pub fn with_edge_tts(voice: impl Into<String>, fallback_duration_secs: f64) -> SlidecastResult<Self> {
        Self::new(Arc::new(EdgeTtsSynthesizer::default()), voice, fallback_duration_secs)
    }

    /// Number of slides synthesized concurrently by [`Self::narrate_all`].
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn synthesizer(&self) -> &dyn SpeechSynthesizer {
        self.synthesizer.as_ref()
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Narrate a single slide into `scope`.
    pub fn narrate(&self, slide: &SlideContent, scope: &WorkingScope) -> SlidecastResult<NarrationUnit> {
        narrate_slide(
            self.synthesizer.as_ref(),
            &self.voice,
            self.fallback_duration_secs,
            slide,
            scope.slide_audio_path(slide.index),
        )
    }

    /// Narrate every slide, at most `jobs` at a time.
    ///
    /// Slides start in deck order and units come back in deck order,
    /// whichever synthesis finishes first. After a failure no further
    /// slide is started; work already running is awaited so nothing is
    /// still writing into `scope` when this returns. The error of the
    /// lowest failing slide is returned.
    pub async fn narrate_all(
        &self,
        slides: &[SlideContent],
        scope: &WorkingScope,
    ) -> SlidecastResult<Vec<NarrationUnit>> {
        let permits = Arc::new(Semaphore::new(self.jobs));
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for (position, slide) in slides.iter().enumerate() {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            if failed.load(Ordering::SeqCst) {
                break;
            }

            let failed = Arc::clone(&failed);
            let synthesizer = Arc::clone(&self.synthesizer);
            let voice = self.voice.clone();
            let fallback = self.fallback_duration_secs;
            let slide = slide.clone();
            let audio_path = scope.slide_audio_path(slide.index);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = narrate_slide(synthesizer.as_ref(), &voice, fallback, &slide, audio_path);
                if result.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                (position, result)
            });
        }

        let mut results: Vec<Option<SlidecastResult<NarrationUnit>>> =
            (0..slides.len()).map(|_| None).collect();
        let mut worker_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => results[position] = Some(result),
                Err(e) => {
                    worker_error.get_or_insert_with(|| {
                        SlidecastError::synthesis(format!("narration worker failed: {e}"))
                    });
                }
            }
        }

        let mut units = Vec::with_capacity(slides.len());
        for result in results.into_iter().flatten() {
            units.push(result?);
        }
        if let Some(e) = worker_error {
            return Err(e);
        }
        if units.len() != slides.len() {
            return Err(SlidecastError::synthesis(format!(
                "narration stopped after {} of {} slides",
                units.len(),
                slides.len()
            )));
        }

        tracing::info!(
            slides = units.len(),
            narrated = units.iter().filter(|u| u.has_audio()).count(),
            jobs = self.jobs,
            "Narration complete"
        );
        Ok(units)
    }
}

fn narrate_slide(
    synthesizer: &dyn SpeechSynthesizer,
    voice: &str,
    fallback_duration_secs: f64,
    slide: &SlideContent,
    audio_path: PathBuf,
) -> SlidecastResult<NarrationUnit> {
    if !slide.has_notes() {
        tracing::debug!(slide = slide.index, "No notes, showing for fallback duration");
        return Ok(NarrationUnit::silent(slide.index, fallback_duration_secs));
    }

    let notes = slide.notes_text.trim();
    tracing::debug!(slide = slide.index, words = slide.word_count(), "Synthesizing narration");
    let measured = synthesizer
        .synthesize(notes, voice, &audio_path)
        .map_err(|e| match e {
            SlidecastError::Synthesis { message } => {
                SlidecastError::synthesis(format!("slide {}: {message}", slide.index))
            }
            other => other,
        })?;

    let written = std::fs::metadata(&audio_path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !written {
        return Err(SlidecastError::synthesis(format!(
            "slide {}: {} reported success but wrote no audio to {}",
            slide.index,
            synthesizer.name(),
            audio_path.display()
        )));
    }

    match measured.filter(|secs| secs.is_finite() && *secs > 0.0) {
        Some(secs) => {
            tracing::debug!(slide = slide.index, duration_secs = secs, "Narration synthesized");
            Ok(NarrationUnit::narrated(slide.index, audio_path, secs))
        }
        None => {
            let estimate = estimate_speaking_secs(notes);
            tracing::warn!(
                slide = slide.index,
                audio = %audio_path.display(),
                estimate_secs = estimate,
                "Could not measure narration audio, using word-count estimate"
            );
            Ok(NarrationUnit::estimated(slide.index, audio_path, estimate))
        }
    }
}

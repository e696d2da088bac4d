//! Narration results, one per slide.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Assumed speaking rate for duration estimates.
pub const ESTIMATED_WORDS_PER_SEC: f64 = 3.0;

/// Where a narration unit's duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// Measured length of the synthesized audio.
    Measured,
    /// Word-count estimate; audio exists but could not be measured.
    Estimated,
    /// Configured display time for a slide without notes.
    Fallback,
}

/// Narration outcome for a single slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationUnit {
    /// Index of the slide this unit belongs to.
    pub slide_index: usize,

    /// Synthesized audio; `None` iff the slide had no notes.
    pub audio_path: Option<PathBuf>,

    /// Seconds the slide stays on screen.
    pub duration_secs: f64,

    /// Provenance of `duration_secs`.
    pub duration_source: DurationSource,
}

impl NarrationUnit {
    /// A silent unit shown for the fallback duration.
    pub fn silent(slide_index: usize, fallback_secs: f64) -> Self {
        Self {
            slide_index,
            audio_path: None,
            duration_secs: fallback_secs,
            duration_source: DurationSource::Fallback,
        }
    }

    /// A narrated unit whose duration was measured from the audio.
    pub fn narrated(slide_index: usize, audio_path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            slide_index,
            audio_path: Some(audio_path.into()),
            duration_secs,
            duration_source: DurationSource::Measured,
        }
    }

    /// A narrated unit whose audio could not be measured.
    pub fn estimated(slide_index: usize, audio_path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            slide_index,
            audio_path: Some(audio_path.into()),
            duration_secs,
            duration_source: DurationSource::Estimated,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_path.is_some()
    }
}

/// Speaking-time estimate for `text` at [`ESTIMATED_WORDS_PER_SEC`].
pub fn estimate_speaking_secs(text: &str) -> f64 {
    text.split_whitespace().count() as f64 / ESTIMATED_WORDS_PER_SEC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_unit_has_no_audio() {
        let unit = NarrationUnit::silent(4, 5.0);
        assert!(!unit.has_audio());
        assert_eq!(unit.duration_secs, 5.0);
        assert_eq!(unit.duration_source, DurationSource::Fallback);
    }

    #[test]
    fn test_estimate_speaking_secs() {
        assert!((estimate_speaking_secs("Hello there friend") - 1.0).abs() < 1e-9);
        assert_eq!(estimate_speaking_secs(""), 0.0);
    }

    #[test]
    fn test_duration_source_serializes_lowercase() {
        let json = serde_json::to_string(&DurationSource::Estimated).unwrap();
        assert_eq!(json, "\"estimated\"");
    }
}

//! Text-to-speech backends.

use std::path::Path;
use std::process::Command;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::process::{command_exists, stderr_summary};

use crate::probe::probe_duration_secs;

/// Trait for speech synthesis backends.
///
/// Implementations are called from worker threads, one call per slide.
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with `voice` into an audio file at `output`.
    ///
    /// Returns the length of the written audio in seconds, or `None` when
    /// the backend produced audio but cannot tell how long it is.
    fn synthesize(&self, text: &str, voice: &str, output: &Path) -> SlidecastResult<Option<f64>>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Reject voice identifiers that cannot name a real voice.
pub fn validate_voice(voice: &str) -> SlidecastResult<()> {
    if voice.is_empty() {
        return Err(SlidecastError::synthesis("voice must not be empty"));
    }
    if voice.chars().any(char::is_whitespace) {
        return Err(SlidecastError::synthesis(format!(
            "invalid voice '{voice}': voice names contain no whitespace"
        )));
    }
    Ok(())
}

/// Microsoft Edge online voices through the `edge-tts` command.
#[derive(Debug, Clone)]
pub struct EdgeTtsSynthesizer {
    command: String,
}

impl Default for EdgeTtsSynthesizer {
    fn default() -> Self {
        Self {
            command: "edge-tts".to_string(),
        }
    }
}

impl EdgeTtsSynthesizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SpeechSynthesizer for EdgeTtsSynthesizer {
    fn synthesize(&self, text: &str, voice: &str, output: &Path) -> SlidecastResult<Option<f64>> {
        validate_voice(voice)?;

        // Notes go through a file so long or dash-prefixed text never
        // reaches the argument parser.
        let text_path = output.with_extension("txt");
        std::fs::write(&text_path, text)?;

        let result = Command::new(&self.command)
            .arg("--voice")
            .arg(voice)
            .arg("--file")
            .arg(&text_path)
            .arg("--write-media")
            .arg(output)
            .output();

        if let Err(e) = std::fs::remove_file(&text_path) {
            tracing::debug!(path = %text_path.display(), error = %e, "Could not remove notes file");
        }

        let result = result.map_err(|e| {
            SlidecastError::synthesis(format!("failed to start {}: {e}", self.command))
        })?;
        if !result.status.success() {
            return Err(SlidecastError::synthesis(format!(
                "{} failed for voice {voice}: {}",
                self.command,
                stderr_summary(&result)
            )));
        }

        Ok(probe_duration_secs(output))
    }

    fn is_available(&self) -> bool {
        command_exists(&self.command)
    }

    fn name(&self) -> &str {
        "edge-tts"
    }
}

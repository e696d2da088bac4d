//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{SlidecastError, SlidecastResult};

/// Voice used when neither the config file nor the CLI names one.
pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Working directory for per-run intermediate artifacts.
    pub work_dir: PathBuf,

    /// Narration defaults.
    pub narration: NarrationDefaults,

    /// Output encoding defaults.
    pub encode: EncodeDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default narration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationDefaults {
    /// Synthesizer voice identifier.
    pub voice: String,

    /// Display time for slides without notes (seconds).
    pub fallback_duration_secs: u32,

    /// Size of the narration worker pool.
    pub jobs: usize,
}

/// Default encoding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeDefaults {
    /// Output frame rate.
    pub fps: u32,

    /// Video codec passed to the encoder.
    pub video_codec: String,

    /// Audio codec passed to the encoder.
    pub audio_codec: String,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slidecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("temp"),
            narration: NarrationDefaults::default(),
            encode: EncodeDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NarrationDefaults {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            fallback_duration_secs: 5,
            jobs: 4,
        }
    }
}

impl Default for EncodeDefaults {
    fn default() -> Self {
        Self {
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Reject settings no run could use. Call this on the merged config,
    /// after command-line overrides.
    pub fn validate(&self) -> SlidecastResult<()> {
        if self.narration.fallback_duration_secs == 0 {
            return Err(SlidecastError::config(
                "narration.fallback_duration_secs must be at least 1 second",
            ));
        }
        if self.narration.jobs == 0 {
            return Err(SlidecastError::config("narration.jobs must be at least 1"));
        }
        if self.work_dir.as_os_str().is_empty() {
            return Err(SlidecastError::config("work_dir must not be empty"));
        }
        Ok(())
    }

    /// Where [`AppConfig::load`] and [`AppConfig::save`] look.
    pub fn config_path() -> PathBuf {
        config_file_path()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("slidecast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_contract() {
        let config = AppConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("temp"));
        assert_eq!(config.narration.voice, DEFAULT_VOICE);
        assert_eq!(config.narration.fallback_duration_secs, 5);
        assert_eq!(config.encode.fps, 24);
        assert_eq!(config.encode.video_codec, "libx264");
        assert_eq!(config.encode.audio_codec, "aac");
    }

    #[test]
    fn test_partial_config_fills_missing_fields() {
        let config: AppConfig =
            serde_json::from_str(r#"{"narration":{"voice":"en-GB-SoniaNeural"}}"#).unwrap();
        assert_eq!(config.narration.voice, "en-GB-SoniaNeural");
        assert_eq!(config.narration.jobs, 4);
        assert_eq!(config.encode.fps, 24);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_fallback_from_file() {
        let config: AppConfig =
            serde_json::from_str(r#"{"narration":{"fallback_duration_secs":0}}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SlidecastError::Config { .. })
        ));
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let mut config = AppConfig::default();
        config.narration.jobs = 0;
        assert!(config.validate().is_err());
    }
}

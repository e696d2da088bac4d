//! Error types shared across Slidecast crates.

use std::path::PathBuf;

/// Top-level error type for Slidecast operations.
///
/// Every pipeline stage maps its failures onto one of these variants and
/// every variant is fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SlidecastError {
    #[error("Working scope error at {path}: {message}")]
    Scope { path: PathBuf, message: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("Failed to render slide {index}: {message}")]
    SlideRender { index: usize, message: String },

    #[error("Synthesis error: {message}")]
    Synthesis { message: String },

    #[error("Assembly error: {message}")]
    Assembly { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SlidecastError.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

impl SlidecastError {
    pub fn scope(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Scope {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    pub fn slide_render(index: usize, msg: impl Into<String>) -> Self {
        Self::SlideRender {
            index,
            message: msg.into(),
        }
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis {
            message: msg.into(),
        }
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Short stage label used in logs and the CLI failure line.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Scope { .. } => "scope",
            Self::Extraction { .. } | Self::SlideRender { .. } => "extract",
            Self::Synthesis { .. } => "narrate",
            Self::Assembly { .. } => "assemble",
            Self::Encode { .. } => "render",
            Self::Config { .. } => "config",
            Self::FileNotFound { .. } | Self::Unsupported { .. } => "preflight",
            Self::Io(_) | Self::Json(_) | Self::Other(_) => "io",
        }
    }
}

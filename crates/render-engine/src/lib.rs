//! Slidecast Render Engine
//!
//! Turns an assembled timeline into the final video file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! slide_0.png ──┐
//! slide_0.mp3 ──┴── segment 0 ──┐
//! slide_1.png ──┐               │
//! (silence) ────┴── segment 1 ──┼── concat ── Encode (H.264/AAC)
//!      ...                      │                  │
//! slide_n.png ──┐               │                  ▼
//! slide_n.mp3 ──┴── segment n ──┘      .talk.partial.mp4 ── rename ── talk.mp4
//! ```

pub mod export;
pub mod ffmpeg;

pub use export::*;
pub use ffmpeg::FfmpegBackend;

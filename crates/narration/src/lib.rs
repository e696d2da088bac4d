//! Slidecast Narration
//!
//! Speech for slides that have speaker notes:
//! - **Synthesis:** Text-to-speech through a pluggable backend (edge-tts by default)
//! - **Measurement:** The produced audio's real length drives the slide duration
//! - **Generation:** One narration unit per slide, on a bounded worker pool
//! - **Subtitles:** SRT/VTT sidecars from the narrated notes

pub mod generator;
pub mod probe;
pub mod subtitles;
pub mod synthesizer;

pub use generator::NarrationGenerator;
pub use subtitles::*;
pub use synthesizer::{EdgeTtsSynthesizer, SpeechSynthesizer};

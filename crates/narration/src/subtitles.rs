//! Subtitle generation in SRT and VTT formats.
//!
//! Each narrated slide's notes are spread over the slide's time span,
//! one cue per sentence, timed in proportion to sentence word count.

use std::path::Path;

use serde::{Deserialize, Serialize};
use slidecast_common::error::SlidecastResult;
use slidecast_deck_model::{SlideContent, Timeline};

/// A single subtitle cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    /// Start time in seconds from the beginning of the video.
    pub start_secs: f64,

    /// End time in seconds.
    pub end_secs: f64,

    /// Spoken text.
    pub text: String,
}

/// Build cues for every narrated entry of `timeline`.
///
/// Silent slides produce no cues. `slides` supplies the notes text and is
/// matched to entries by slide index.
pub fn cues_for_timeline(slides: &[SlideContent], timeline: &Timeline) -> Vec<SubtitleCue> {
    let mut cues = Vec::new();

    for (entry, start) in timeline.iter().zip(timeline.start_offsets()) {
        if entry.audio_path.is_none() || entry.duration_secs <= 0.0 {
            continue;
        }
        let Some(slide) = slides.iter().find(|s| s.index == entry.slide_index) else {
            continue;
        };

        let sentences = split_sentences(&slide.notes_text);
        let total_words: usize = sentences.iter().map(|s| word_count(s)).sum();
        if total_words == 0 {
            continue;
        }

        let end_of_slide = start + entry.duration_secs;
        let mut cursor = start;
        let mut spoken = 0;
        for sentence in sentences {
            spoken += word_count(&sentence);
            let end = if spoken == total_words {
                end_of_slide
            } else {
                start + entry.duration_secs * spoken as f64 / total_words as f64
            };
            cues.push(SubtitleCue {
                start_secs: cursor,
                end_secs: end,
                text: sentence,
            });
            cursor = end;
        }
    }

    cues
}

/// Generate SRT subtitle content from cues.
pub fn generate_srt(cues: &[SubtitleCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start_secs),
            format_srt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content from cues.
pub fn generate_vtt(cues: &[SubtitleCue]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(cue.start_secs),
            format_vtt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Save subtitles to a file; `.vtt` selects WebVTT, anything else SRT.
pub fn save_subtitles(cues: &[SubtitleCue], path: &Path) -> SlidecastResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(cues),
        _ => generate_srt(cues),
    };
    std::fs::write(path, content)?;
    Ok(())
}

fn split_sentences(notes: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for word in notes.split_whitespace() {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_time(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_time(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

fn split_time(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

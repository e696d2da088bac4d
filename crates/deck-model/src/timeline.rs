//! The ordered timeline consumed by rendering.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One rendered segment: a still image held for `duration_secs`, with an
/// optional narration track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Deck index of the slide this segment shows.
    pub slide_index: usize,

    pub image_path: PathBuf,

    pub audio_path: Option<PathBuf>,

    pub duration_secs: f64,
}

/// Timeline document (`--dump-timeline` output).
///
/// `entries[i]` corresponds to deck slide `i`. The timeline never reorders
/// or drops entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Schema version.
    pub version: String,

    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn from_entries(entries: Vec<TimelineEntry>) -> Self {
        Self {
            version: "1.0".to_string(),
            entries,
        }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_secs).sum()
    }

    /// Number of entries carrying a narration track.
    pub fn narrated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.audio_path.is_some()).count()
    }

    /// Start time of each entry in the rendered output.
    pub fn start_offsets(&self) -> Vec<f64> {
        let mut offsets = Vec::with_capacity(self.entries.len());
        let mut t = 0.0;
        for entry in &self.entries {
            offsets.push(t);
            t += entry.duration_secs;
        }
        offsets
    }

    /// Write the timeline as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEntry;
    type IntoIter = std::slice::Iter<'a, TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(i: usize, audio: bool, duration_secs: f64) -> TimelineEntry {
        TimelineEntry {
            slide_index: i,
            image_path: PathBuf::from(format!("slide_{i}.png")),
            audio_path: audio.then(|| PathBuf::from(format!("slide_{i}.mp3"))),
            duration_secs,
        }
    }

    #[test]
    fn test_totals_and_offsets() {
        let timeline = Timeline::from_entries(vec![
            entry(0, true, 1.3),
            entry(1, false, 5.0),
            entry(2, true, 0.9),
        ]);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.narrated_count(), 2);
        assert!((timeline.total_duration_secs() - 7.2).abs() < 1e-9);

        let offsets = timeline.start_offsets();
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] - 1.3).abs() < 1e-9);
        assert!((offsets[2] - 6.3).abs() < 1e-9);
    }

    #[test]
    fn test_timeline_serialization() {
        let timeline = Timeline::from_entries(vec![entry(0, false, 5.0)]);
        let json = serde_json::to_string_pretty(&timeline).unwrap();
        let parsed: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, timeline);
        assert_eq!(parsed.version, "1.0");
    }

    proptest! {
        #[test]
        fn offsets_are_non_decreasing(durations in proptest::collection::vec(0.0f64..60.0, 0..32)) {
            let timeline = Timeline::from_entries(
                durations.iter().enumerate().map(|(i, d)| entry(i, i % 2 == 0, *d)).collect(),
            );
            let offsets = timeline.start_offsets();
            prop_assert_eq!(offsets.len(), durations.len());
            for pair in offsets.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
            let sum: f64 = durations.iter().sum();
            prop_assert!((timeline.total_duration_secs() - sum).abs() < 1e-6);
        }
    }
}

//! Index-aligned timeline assembly.
//!
//! `slides[i]` is paired with `narrations[i]`. The caller builds exactly one
//! narration unit per slide, in deck order. A length or index mismatch is
//! an assembly error; nothing is truncated or realigned.

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_deck_model::{NarrationUnit, SlideContent, Timeline, TimelineEntry};

/// Build the timeline for `slides` from their narration results.
///
/// Durations are taken from the narration units verbatim. A zero fallback
/// duration produces a zero-length entry; bounds on configured durations
/// are enforced where they are configured, not here.
pub fn assemble(slides: &[SlideContent], narrations: &[NarrationUnit]) -> SlidecastResult<Timeline> {
    if slides.len() != narrations.len() {
        return Err(SlidecastError::assembly(format!(
            "slide count ({}) does not match narration count ({})",
            slides.len(),
            narrations.len()
        )));
    }

    let mut entries = Vec::with_capacity(slides.len());
    for (position, (slide, narration)) in slides.iter().zip(narrations).enumerate() {
        if narration.slide_index != slide.index {
            return Err(SlidecastError::assembly(format!(
                "position {position}: narration for slide {} paired with slide {}",
                narration.slide_index, slide.index
            )));
        }

        entries.push(TimelineEntry {
            slide_index: slide.index,
            image_path: slide.image_path.clone(),
            audio_path: narration.audio_path.clone(),
            duration_secs: narration.duration_secs,
        });
    }

    let timeline = Timeline::from_entries(entries);
    tracing::info!(
        entries = timeline.len(),
        narrated = timeline.narrated_count(),
        total_secs = timeline.total_duration_secs(),
        "Timeline assembled"
    );
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn slide(i: usize, notes: &str) -> SlideContent {
        SlideContent::new(i, format!("temp/slide_{i}.png"), notes)
    }

    #[test]
    fn test_empty_inputs_give_empty_timeline() {
        let timeline = assemble(&[], &[]).unwrap();
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_silent_slide_uses_fallback_exactly() {
        let slides = vec![slide(0, "")];
        let narrations = vec![NarrationUnit::silent(0, 5.0)];

        let timeline = assemble(&slides, &narrations).unwrap();
        let entry = &timeline.entries()[0];
        assert!(entry.audio_path.is_none());
        assert_eq!(entry.duration_secs, 5.0);
    }

    #[test]
    fn test_narrated_slide_keeps_measured_duration() {
        // "Hello there friend" estimates to 1.0s; the measured 1.3s must win.
        let slides = vec![slide(0, "Hello there friend")];
        let narrations = vec![NarrationUnit::narrated(0, "temp/slide_0.mp3", 1.3)];

        let timeline = assemble(&slides, &narrations).unwrap();
        let entry = &timeline.entries()[0];
        assert_eq!(entry.duration_secs, 1.3);
        assert_eq!(
            entry.audio_path.as_deref(),
            Some(std::path::Path::new("temp/slide_0.mp3"))
        );
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let slides = vec![slide(0, "a"), slide(1, ""), slide(2, "c")];
        let narrations = vec![
            NarrationUnit::narrated(0, "temp/slide_0.mp3", 1.0),
            NarrationUnit::silent(1, 5.0),
        ];

        let err = assemble(&slides, &narrations).unwrap_err();
        assert!(matches!(err, SlidecastError::Assembly { .. }));
        assert!(err.to_string().contains("slide count (3)"));
    }

    #[test]
    fn test_more_narrations_than_slides_is_rejected() {
        let slides = vec![slide(0, "")];
        let narrations = vec![NarrationUnit::silent(0, 5.0), NarrationUnit::silent(1, 5.0)];

        assert!(matches!(
            assemble(&slides, &narrations),
            Err(SlidecastError::Assembly { .. })
        ));
    }

    #[test]
    fn test_misaligned_indices_are_rejected() {
        let slides = vec![slide(0, ""), slide(1, "")];
        let narrations = vec![NarrationUnit::silent(1, 5.0), NarrationUnit::silent(0, 5.0)];

        let err = assemble(&slides, &narrations).unwrap_err();
        assert!(err.to_string().contains("position 0"));
    }

    #[test]
    fn test_zero_fallback_is_not_clamped() {
        let slides = vec![slide(0, ""), slide(1, "")];
        let narrations = vec![NarrationUnit::silent(0, 0.0), NarrationUnit::silent(1, 0.0)];

        let timeline = assemble(&slides, &narrations).unwrap();
        assert_eq!(timeline.len(), 2);
        assert!(timeline.iter().all(|e| e.duration_secs == 0.0));
        assert_eq!(timeline.total_duration_secs(), 0.0);
    }

    proptest! {
        #[test]
        fn timeline_preserves_length_and_order(
            notes in proptest::collection::vec(proptest::option::of(0.1f64..30.0), 0..40),
            fallback in 0u32..10,
        ) {
            let slides: Vec<_> = notes
                .iter()
                .enumerate()
                .map(|(i, d)| slide(i, if d.is_some() { "spoken words" } else { "" }))
                .collect();
            let narrations: Vec<_> = notes
                .iter()
                .enumerate()
                .map(|(i, d)| match d {
                    Some(secs) => NarrationUnit::narrated(i, format!("temp/slide_{i}.mp3"), *secs),
                    None => NarrationUnit::silent(i, fallback as f64),
                })
                .collect();

            let timeline = assemble(&slides, &narrations).unwrap();
            prop_assert_eq!(timeline.len(), slides.len());
            for (i, entry) in timeline.iter().enumerate() {
                prop_assert_eq!(entry.slide_index, i);
                prop_assert_eq!(&entry.image_path, &slides[i].image_path);
                prop_assert_eq!(entry.duration_secs, narrations[i].duration_secs);
                prop_assert_eq!(entry.audio_path.is_some(), notes[i].is_some());
            }
        }

        #[test]
        fn unequal_lengths_always_fail(n in 0usize..20, m in 0usize..20) {
            prop_assume!(n != m);
            let slides: Vec<_> = (0..n).map(|i| slide(i, "")).collect();
            let narrations: Vec<_> = (0..m).map(|i| NarrationUnit::silent(i, 5.0)).collect();
            prop_assert!(
                matches!(assemble(&slides, &narrations), Err(SlidecastError::Assembly { .. })),
                "expected an assembly error"
            );
        }
    }
}

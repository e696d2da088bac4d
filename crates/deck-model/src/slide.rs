//! Per-slide content produced by deck extraction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One slide of the deck after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    /// Zero-based position in the deck.
    pub index: usize,

    /// Rendered still image of the slide.
    pub image_path: PathBuf,

    /// Speaker notes; empty when the slide has none.
    pub notes_text: String,
}

impl SlideContent {
    pub fn new(index: usize, image_path: impl Into<PathBuf>, notes_text: impl Into<String>) -> Self {
        Self {
            index,
            image_path: image_path.into(),
            notes_text: notes_text.into(),
        }
    }

    /// Whether the slide carries notes worth narrating.
    pub fn has_notes(&self) -> bool {
        !self.notes_text.trim().is_empty()
    }

    /// Number of whitespace-separated words in the notes.
    pub fn word_count(&self) -> usize {
        self.notes_text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_only_notes_are_empty() {
        let slide = SlideContent::new(0, "slide_0.png", "  \n\t ");
        assert!(!slide.has_notes());
        assert_eq!(slide.word_count(), 0);
    }

    #[test]
    fn test_word_count() {
        let slide = SlideContent::new(1, "slide_1.png", "Hello there\nfriend");
        assert!(slide.has_notes());
        assert_eq!(slide.word_count(), 3);
    }
}

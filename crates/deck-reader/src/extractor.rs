//! Deck extraction: one [`SlideContent`] per slide, in deck order.

use std::path::Path;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::WorkingScope;
use slidecast_deck_model::SlideContent;

use crate::notes::{NotesReader, PptxNotesReader};
use crate::renderer::{DeckRenderer, LibreOfficeRenderer, RenderSession};

/// Deck formats whose notes we can read.
const SUPPORTED_EXTENSIONS: &[&str] = &["pptx", "pptm", "ppsx"];

/// Pairs rendered slide images with speaker notes.
pub struct ContentExtractor {
    renderer: Box<dyn DeckRenderer>,
    notes: Box<dyn NotesReader>,
}

impl ContentExtractor {
    pub fn new(renderer: Box<dyn DeckRenderer>, notes: Box<dyn NotesReader>) -> Self {
        Self { renderer, notes }
    }

    /// Headless LibreOffice for images, the package itself for notes.
    pub fn with_defaults() -> Self {
        Self::new(
            Box::new(LibreOfficeRenderer::default()),
            Box::new(PptxNotesReader),
        )
    }

    pub fn renderer(&self) -> &dyn DeckRenderer {
        self.renderer.as_ref()
    }

    /// Extract every slide of `deck_path`, writing images into `scope`.
    ///
    /// Either every slide is extracted or the call fails; there is no
    /// partial result.
    pub fn extract(&self, deck_path: &Path, scope: &WorkingScope) -> SlidecastResult<Vec<SlideContent>> {
        if !deck_path.is_file() {
            return Err(SlidecastError::extraction(format!(
                "deck not found: {}",
                deck_path.display()
            )));
        }
        let extension = deck_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(SlidecastError::extraction(format!(
                "unsupported deck format '{extension}' (expected one of: {})",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let notes = self.notes.read_notes(deck_path)?;

        let mut session = self.renderer.open(deck_path, scope)?;
        let rendered = render_all(session.as_mut(), &notes, scope);
        let closed = session.close();

        let slides = match (rendered, closed) {
            (Ok(slides), Ok(())) => slides,
            (Ok(slides), Err(close_err)) => {
                tracing::warn!(
                    backend = self.renderer.name(),
                    error = %close_err,
                    "Renderer did not release cleanly"
                );
                slides
            }
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(close_err)) => {
                tracing::error!(
                    backend = self.renderer.name(),
                    error = %close_err,
                    "Renderer did not release cleanly after a failed extraction"
                );
                return Err(e);
            }
        };

        tracing::info!(
            deck = %deck_path.display(),
            slides = slides.len(),
            with_notes = slides.iter().filter(|s| s.has_notes()).count(),
            "Deck extracted"
        );
        Ok(slides)
    }
}

fn render_all(
    session: &mut dyn RenderSession,
    notes: &[String],
    scope: &WorkingScope,
) -> SlidecastResult<Vec<SlideContent>> {
    let rendered_count = session.slide_count();
    if rendered_count != notes.len() {
        return Err(SlidecastError::extraction(format!(
            "renderer produced {rendered_count} slides but the deck defines {}",
            notes.len()
        )));
    }

    let mut slides = Vec::with_capacity(notes.len());
    for (index, notes_text) in notes.iter().enumerate() {
        let image_path = scope.slide_image_path(index);
        session.export_slide(index, &image_path)?;
        if !image_path.is_file() {
            return Err(SlidecastError::slide_render(
                index,
                format!("renderer reported success but {} is missing", image_path.display()),
            ));
        }
        tracing::debug!(index, image = %image_path.display(), "Slide rendered");
        slides.push(SlideContent::new(index, image_path, notes_text.trim()));
    }
    Ok(slides)
}

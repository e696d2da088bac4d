//! Slidecast Deck Reader
//!
//! Turns a presentation file into an ordered list of slides:
//! - **Rendering:** Slide images through an external renderer session
//! - **Notes:** Speaker notes read directly from the `.pptx` package
//! - **Extraction:** Pairs the two, one `SlideContent` per slide
//!
//! Both collaborators sit behind traits so the pipeline can run against
//! other backends (or fakes in tests).

pub mod extractor;
pub mod notes;
pub mod renderer;

pub use extractor::ContentExtractor;
pub use notes::{NotesReader, PptxNotesReader};
pub use renderer::{DeckRenderer, LibreOfficeRenderer, RenderSession};

//! Slidecast Deck Model
//!
//! Defines the data contracts that flow through the pipeline:
//! - **Slides:** Rendered image plus speaker notes, one per deck slide
//! - **Narration:** Optional audio track and the duration that drives a slide
//! - **Timeline:** The ordered (image, audio, duration) entries handed to rendering
//!
//! Every sequence here is indexed by deck order. Nothing in this crate
//! reorders or filters slides.

pub mod narration;
pub mod slide;
pub mod timeline;

pub use narration::*;
pub use slide::*;
pub use timeline::*;

//! Slidecast Assembler
//!
//! Merges the two per-slide sequences produced by the pipeline, rendered
//! slides and narration units, into the [`Timeline`] handed to rendering.
//!
//! This crate is pure computation: no I/O, no external processes.
//! All inputs are data; all outputs are data.
//!
//! [`Timeline`]: slidecast_deck_model::Timeline

pub mod assemble;

pub use assemble::assemble;

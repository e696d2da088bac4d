//! Slidecast Pipeline
//!
//! Drives one deck-to-video run:
//!
//! ```text
//! open scope ─► extract ─► narrate × N ─► assemble ─► render ─► close scope
//!      │                                                            ▲
//!      └──────────────────── on any failure ────────────────────────┘
//! ```
//!
//! The working scope is closed on every path before the run returns.

pub mod run;

pub use run::{Pipeline, PipelineOptions, RunSummary};

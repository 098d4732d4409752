//! Beat-relative note documents ↔ Standard MIDI Files
//!
//! This crate converts symbolic note data between a beat-relative JSON
//! document (notes in beats plus an explicit tempo map) and time-based
//! binary notation (notes in absolute time with embedded tempo events).
//! The core is the tempo-map engine: [`TempoMap`] canonicalizes a tempo
//! schedule and [`BeatTimeConverter`] maps between beats and seconds.

pub mod cli;
pub mod codec;
pub mod config;
pub mod converters;
pub mod diagnostics;
pub mod models;
pub mod timing;

// Re-export commonly used types
pub use codec::{Codec, DecodedScore, TimedScore};
pub use config::ConversionConfig;
pub use converters::{ConversionError, ConversionOrchestrator, Converted};
pub use diagnostics::ConversionReport;
pub use models::{BeatDocument, NoteEvent, TempoEvent, TempoMap};
pub use timing::BeatTimeConverter;

//! Models module for beat-relative note data
//!
//! This module contains the validated data structures the conversion
//! engine works on: the tempo map, notes, tracks and documents.

pub mod catalog;
pub mod document;
pub mod fields;
pub mod note;
pub mod tempo;

// Re-export commonly used types
pub use catalog::{NoteCatalog, Track};
pub use document::{BeatDocument, RawDocument, SchemaError};
pub use note::{parse_note, NoteEvent, NoteOptions, NoteValidationError};
pub use tempo::{Anchor, AnchorTable, TempoEvent, TempoMap, TempoMapError, TempoOptions};

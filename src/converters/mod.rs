//! Conversion runs
//!
//! This module drives conversions between beat-relative documents and the
//! time-domain model handled by the binary codecs.

pub mod errors;
pub mod orchestrator;

// Re-export for convenience
pub use errors::ConversionError;
pub use orchestrator::{ConversionOrchestrator, Converted};

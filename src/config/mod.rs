//! Conversion configuration
//!
//! Every optional knob of a conversion run lives in [`ConversionConfig`],
//! with its default spelled out once in [`defaults`]. A config can be
//! loaded from a JSON file; missing keys take their defaults.

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use defaults::{
    DEFAULT_CHANNEL, DEFAULT_TEMPO_BPM, DEFAULT_TPQ, DEFAULT_TRACK, DEFAULT_VELOCITY, MAX_TPQ,
    MAX_TRACK_ID, MIN_NOTE_SECONDS, SMF_DEFAULT_TEMPO_BPM,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Which binary codec a conversion encodes to or decodes from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// Standard MIDI File, format 1
    #[default]
    Smf,
    /// The time-domain model serialized as JSON (absolute seconds)
    TimedJson,
}

/// How beat documents are rendered
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented, one field per line
    #[default]
    Pretty,
    /// Single line
    Compact,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ConversionConfig {
    /// Resolution used when a document has no `resolution` key
    pub default_resolution: u16,
    /// Tempo used for coercion and for a synthesized beat-0 anchor
    pub default_bpm: f64,
    /// Tempo substituted for an empty tempo map; `None` makes it fatal
    pub empty_tempo_fallback_bpm: Option<f64>,
    /// Duration given to notes whose converted end time is not after their start
    pub min_note_seconds: f64,
    /// Reject notes whose channel is outside 0..=15
    pub enforce_channel: bool,
    pub codec: CodecKind,
    pub output_format: OutputFormat,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            default_resolution: DEFAULT_TPQ,
            default_bpm: DEFAULT_TEMPO_BPM,
            empty_tempo_fallback_bpm: None,
            min_note_seconds: MIN_NOTE_SECONDS,
            enforce_channel: true,
            codec: CodecKind::Smf,
            output_format: OutputFormat::Pretty,
        }
    }
}

impl ConversionConfig {
    /// Check every field once so the conversion code can rely on them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_resolution == 0 || self.default_resolution > MAX_TPQ {
            return Err(ConfigError::Invalid(format!(
                "default_resolution must be in 1..={}, got {}",
                MAX_TPQ, self.default_resolution
            )));
        }
        if !is_positive_finite(self.default_bpm) {
            return Err(ConfigError::Invalid(format!(
                "default_bpm must be positive, got {}",
                self.default_bpm
            )));
        }
        if let Some(bpm) = self.empty_tempo_fallback_bpm {
            if !is_positive_finite(bpm) {
                return Err(ConfigError::Invalid(format!(
                    "empty_tempo_fallback_bpm must be positive, got {}",
                    bpm
                )));
            }
        }
        if !is_positive_finite(self.min_note_seconds) {
            return Err(ConfigError::Invalid(format!(
                "min_note_seconds must be positive, got {}",
                self.min_note_seconds
            )));
        }
        Ok(())
    }
}

/// Load and validate a JSON config file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConversionConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: ConversionConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

//! Error types for a conversion run
//!
//! Only fatal problems end up here; per-note and per-tempo-entry problems
//! are recovered and reported through
//! [`ConversionReport`](crate::diagnostics::ConversionReport).

use thiserror::Error;

use crate::codec::{DecodeError, EncodeError};
use crate::config::ConfigError;
use crate::models::{SchemaError, TempoMapError};

/// Top-level conversion error type
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Input could not be parsed as the expected document format
    #[error("cannot parse input: {0}")]
    Input(String),

    /// Input parsed but has the wrong top-level shape
    #[error("invalid document: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid tempo map: {0}")]
    TempoMap(#[from] TempoMapError),

    #[error("cannot decode input: {0}")]
    Decode(#[from] DecodeError),

    #[error("cannot encode output: {0}")]
    Encode(#[from] EncodeError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading the source or writing the destination failed
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ConversionError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code: 2 for I/O failures, 1 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            ConversionError::Io { .. } | ConversionError::Config(ConfigError::Read { .. }) => 2,
            _ => 1,
        }
    }
}

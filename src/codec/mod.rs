//! Binary codecs
//!
//! A codec turns raw bytes into the time-domain model (tempo events in
//! beats, notes in absolute seconds) and back. The conversion engine only
//! ever talks to the [`Codec`] trait; which implementation is used is picked
//! from [`CodecKind`] in the configuration.

pub mod smf;
pub mod timed_json;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CodecKind;
use crate::models::TempoEvent;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("unsupported timing: {0}")]
    UnsupportedTiming(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("track {track}: note at {time}s cannot be encoded (times must be finite and non-negative)")]
    InvalidTime { track: u32, time: f64 },
    #[error("value cannot be represented: {0}")]
    Unrepresentable(String),
    #[error("write error: {0}")]
    Write(String),
}

/// Note as decoded from a binary source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedNote {
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub track_index: u32,
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
}

/// Everything a decoder extracts from a binary source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedScore {
    pub resolution: u16,
    /// Tempo changes as found in the source, not yet canonicalized
    pub tempo_events: Vec<TempoEvent>,
    pub notes: Vec<DecodedNote>,
    /// Recoverable problems met while decoding
    pub warnings: Vec<String>,
}

/// Note in absolute time, ready for encoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedTrack {
    pub track_id: u32,
    pub notes: Vec<TimedNote>,
}

/// Time-domain score handed to an encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedScore {
    pub resolution: u16,
    /// Canonical tempo map
    pub tempo_events: Vec<TempoEvent>,
    pub tracks: Vec<TimedTrack>,
}

impl TimedScore {
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Reject note times no encoder can represent.
    pub fn check_times(&self) -> Result<(), EncodeError> {
        for track in &self.tracks {
            for note in &track.notes {
                for time in [note.start_time_seconds, note.end_time_seconds] {
                    if !time.is_finite() || time < 0.0 {
                        return Err(EncodeError::InvalidTime {
                            track: track.track_id,
                            time,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

pub trait Codec {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<DecodedScore, DecodeError>;

    fn encode(&self, score: &TimedScore) -> Result<Vec<u8>, EncodeError>;
}

/// Codec implementation for a configured kind
pub fn codec_for(kind: CodecKind) -> Box<dyn Codec> {
    match kind {
        CodecKind::Smf => Box::new(smf::SmfCodec),
        CodecKind::TimedJson => Box::new(timed_json::TimedJsonCodec),
    }
}
